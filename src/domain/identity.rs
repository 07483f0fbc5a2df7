//! Caller identity, passed explicitly into every workflow operation.

use crate::domain::ProfessionalId;

/// Who is making the call. Resolution from tokens/headers happens at the
/// transport edge; workflows only see the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    professional_id: Option<ProfessionalId>,
}

impl IdentityContext {
    pub fn anonymous() -> Self {
        Self {
            professional_id: None,
        }
    }

    pub fn professional(id: ProfessionalId) -> Self {
        Self {
            professional_id: Some(id),
        }
    }

    /// The resolved professional id, if any.
    pub fn professional_id(&self) -> Option<&ProfessionalId> {
        self.professional_id.as_ref()
    }
}
