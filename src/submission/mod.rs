//! Submission and form model consumed by the notification pipeline.
//!
//! A [`Submission`] arrives fully materialized (usually as JSON) together with
//! its owning [`Form`] and that form's [`NotificationRule`] list. Nothing in
//! this module performs I/O.

mod types;

pub use types::{
    Field, FieldContent, FieldId, FieldRef, Form, FormId, NotificationId, NotificationRule,
    Submission, SubmissionId,
};
