use crate::error::SessionError;

pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 9;

/// What a confirmed checkpoint records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointAnswer {
    /// Scale pick, or 0 when confirmed without one
    pub rating: u8,
    pub note: String,
}

/// Free-text plus 1-9 scale form shown at each checkpoint
///
/// Both inputs are optional individually. A plain submit needs the scale
/// value; anything less opens the incomplete-submission prompt, which the
/// participant either dismisses (back to editing) or confirms.
#[derive(Debug, Clone, Default)]
pub struct CheckpointForm {
    note: String,
    rating: Option<u8>,
    prompt_open: bool,
}

impl CheckpointForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    pub fn pick_rating(&mut self, rating: u8) -> Result<(), SessionError> {
        if !(RATING_MIN..=RATING_MAX).contains(&rating) {
            return Err(SessionError::RatingOutOfRange(rating));
        }
        self.rating = Some(rating);
        Ok(())
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn rating(&self) -> Option<u8> {
        self.rating
    }

    /// Whether the incomplete-submission prompt is showing
    pub fn prompt_open(&self) -> bool {
        self.prompt_open
    }

    /// Submit the form; fails and opens the prompt when the scale is missing
    pub fn submit(&mut self) -> Result<CheckpointAnswer, SessionError> {
        match self.rating {
            Some(rating) => {
                self.prompt_open = false;
                Ok(CheckpointAnswer {
                    rating,
                    note: self.note.clone(),
                })
            }
            None => {
                self.prompt_open = true;
                Err(SessionError::MalformedCheckpointSubmission {
                    has_note: !self.note.trim().is_empty(),
                })
            }
        }
    }

    /// Confirm whatever subset was provided; a missing scale records 0
    pub fn confirm_incomplete(&mut self) -> CheckpointAnswer {
        self.prompt_open = false;
        CheckpointAnswer {
            rating: self.rating.unwrap_or(0),
            note: self.note.trim().to_string(),
        }
    }

    /// Close the prompt and keep editing
    pub fn dismiss_prompt(&mut self) {
        self.prompt_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_with_rating_and_note() {
        let mut form = CheckpointForm::new();
        form.set_note("ok");
        form.pick_rating(7).unwrap();

        let answer = form.submit().unwrap();
        assert_eq!(answer, CheckpointAnswer { rating: 7, note: "ok".to_string() });
        assert!(!form.prompt_open());
    }

    #[test]
    fn test_submit_text_only_opens_prompt() {
        let mut form = CheckpointForm::new();
        form.set_note("felt fine");

        let err = form.submit().unwrap_err();
        assert!(matches!(err, SessionError::MalformedCheckpointSubmission { has_note: true }));
        assert!(form.prompt_open());

        form.dismiss_prompt();
        assert!(!form.prompt_open());
    }

    #[test]
    fn test_submit_empty_form_is_rejected() {
        let mut form = CheckpointForm::new();
        let err = form.submit().unwrap_err();
        assert!(matches!(err, SessionError::MalformedCheckpointSubmission { has_note: false }));
    }

    #[test]
    fn test_forced_confirm_defaults_rating_to_zero() {
        let mut form = CheckpointForm::new();
        form.set_note("  trailing  ");
        let _ = form.submit();

        let answer = form.confirm_incomplete();
        assert_eq!(answer.rating, 0);
        assert_eq!(answer.note, "trailing");
        assert!(!form.prompt_open());
    }

    #[test]
    fn test_rating_out_of_range() {
        let mut form = CheckpointForm::new();
        assert!(matches!(form.pick_rating(0), Err(SessionError::RatingOutOfRange(0))));
        assert!(form.pick_rating(10).is_err());
        assert_eq!(form.rating(), None);

        form.pick_rating(9).unwrap();
        form.pick_rating(2).unwrap();
        assert_eq!(form.rating(), Some(2));
    }
}
