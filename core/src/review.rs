// hopz/src/review.rs
use crate::error::RuleViolation;
use serde::{Deserialize, Serialize};

pub const COMMENT_MIN_CHARS: usize = 3;
pub const COMMENT_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDraft {
  pub rating: i32,
  pub comment: String,
  #[serde(default = "default_recommend")]
  pub recommend: bool,
}

fn default_recommend() -> bool {
  true
}

impl ReviewDraft {
  pub fn validate(&self) -> Result<(), RuleViolation> {
    if !(1..=5).contains(&self.rating) {
      return Err(RuleViolation::InvalidReview("rating must be between 1 and 5".into()));
    }
    let chars = self.comment.trim().chars().count();
    if !(COMMENT_MIN_CHARS..=COMMENT_MAX_CHARS).contains(&chars) {
      return Err(RuleViolation::InvalidReview(format!(
        "comment must be {COMMENT_MIN_CHARS}-{COMMENT_MAX_CHARS} characters"
      )));
    }
    Ok(())
  }
}
