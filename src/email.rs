//! Administrative email drafting.
//!
//! Students request formally structured emails to the administration for
//! a fixed set of procedures. Each request kind maps to a subject line
//! and a one-line purpose that are baked into a drafting prompt; the
//! model fills in the body, leaving bracketed placeholders for fields it
//! cannot know. Drafting uses a slightly higher temperature and a tighter
//! token cap than conversational answering.

use anyhow::Result;
use std::str::FromStr;

use crate::llm::{ChatModel, CompletionParams};
use crate::models::ChatMessage;

const DRAFT_TEMPERATURE: f32 = 0.3;
const DRAFT_MAX_TOKENS: u32 = 900;

/// The administrative procedures the assistant can draft emails for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    EnrollmentCertificate,
    InternshipAgreement,
    GradeAppeal,
    AbsenceJustification,
    TransferRequest,
    ScholarshipRequest,
}

impl EmailKind {
    /// Subject line of the drafted email.
    pub fn subject(&self) -> &'static str {
        match self {
            EmailKind::EnrollmentCertificate => "Enrollment certificate request",
            EmailKind::InternshipAgreement => "Final-year internship agreement request",
            EmailKind::GradeAppeal => "Exam grade appeal",
            EmailKind::AbsenceJustification => "Absence justification",
            EmailKind::TransferRequest => "Transfer request",
            EmailKind::ScholarshipRequest => "Scholarship request",
        }
    }

    /// One-line purpose inserted into the drafting prompt.
    fn purpose(&self) -> &'static str {
        match self {
            EmailKind::EnrollmentCertificate => {
                "a certificate proving their current enrollment"
            }
            EmailKind::InternshipAgreement => {
                "a final-year project internship agreement"
            }
            EmailKind::GradeAppeal => "a review or verification of an exam grade",
            EmailKind::AbsenceJustification => {
                "justification of an absence from classes or exams"
            }
            EmailKind::TransferRequest => {
                "a transfer to another institution or study track"
            }
            EmailKind::ScholarshipRequest => {
                "the award or renewal of a study scholarship"
            }
        }
    }
}

impl FromStr for EmailKind {
    type Err = UnknownEmailKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrollment_certificate" => Ok(EmailKind::EnrollmentCertificate),
            "internship_agreement" => Ok(EmailKind::InternshipAgreement),
            "grade_appeal" => Ok(EmailKind::GradeAppeal),
            "absence_justification" => Ok(EmailKind::AbsenceJustification),
            "transfer_request" => Ok(EmailKind::TransferRequest),
            "scholarship_request" => Ok(EmailKind::ScholarshipRequest),
            _ => Err(UnknownEmailKind(s.to_string())),
        }
    }
}

/// Rejection of an email kind outside the supported set.
#[derive(Debug)]
pub struct UnknownEmailKind(pub String);

impl std::fmt::Display for UnknownEmailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown email kind: {}", self.0)
    }
}

impl std::error::Error for UnknownEmailKind {}

/// Draft one administrative email.
///
/// `student_name` and `reason` may be empty; the prompt then instructs
/// the model to leave bracketed placeholders instead.
pub async fn draft_email(
    model: &dyn ChatModel,
    kind: EmailKind,
    student_name: &str,
    reason: &str,
) -> Result<String> {
    let prompt = build_draft_prompt(kind, student_name, reason);
    let params = CompletionParams {
        temperature: DRAFT_TEMPERATURE,
        top_p: None,
        max_tokens: DRAFT_MAX_TOKENS,
    };
    model.complete(&[ChatMessage::user(prompt)], params).await
}

fn build_draft_prompt(kind: EmailKind, student_name: &str, reason: &str) -> String {
    let name = if student_name.is_empty() {
        "[First LAST]"
    } else {
        student_name
    };
    let details = if reason.is_empty() {
        "[to be completed]"
    } else {
        reason
    };

    format!(
        "Write a formal administrative email to a university administration office.\n\n\
         SUBJECT: {}\n\
         CONTEXT: The student is requesting {}.\n\
         NAME: {}\n\
         DETAILS: {}\n\n\
         Structure: Subject / Salutation / Introduction / Body / Closing / Sign-off / Full signature.\n\
         Leave [bracketed] placeholders for fields to personalize. The email must be complete and ready to send.",
        kind.subject(),
        kind.purpose(),
        name,
        details
    )
}
