//! Data Transfer Objects for the play backend.

mod action_detail;
pub mod requests;

pub use action_detail::ActionDetail;
pub use requests::{
    Answer, AnswerSubmission, AnswerVerdict, HintPurchaseRequest, HintPurchaseResponse,
    TransitionRequest,
};
