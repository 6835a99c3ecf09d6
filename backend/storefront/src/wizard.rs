//! Camp registration wizard: a reducer-driven step machine.
//!
//! The branch (individual or institution) is part of the state's variant, so
//! each branch carries its own step type and the valid step range follows
//! from the type:
//!
//! | Step | Individual            | Institution          |
//! |------|-----------------------|----------------------|
//! | 1    | registration type     | registration type    |
//! | 2    | student details       | institution details  |
//! | 3    | parent/guardian       | camp selection       |
//! | 4    | camp selection        | medical information  |
//! | 5    | medical information   | review               |
//! | 6    | review                | -                    |
//!
//! Every change goes through [`reduce`]; [`Wizard`] adds the submission
//! lifecycle (`submitting` / `submitted`) on top of the pure state.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::catalog::CampKey;
use crate::errors::{StorefrontError, SubmitError};
use crate::registration::{
    ExperienceLevel, InstitutionType, ProgramFormat, RegistrationDraft, RegistrationRecord,
    RegistrationType, StudentCount,
};
use crate::store::{self, Collection, DocumentId, RecordStore};

// ─────────────────────────────────────────────────────────
// Steps
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndividualStep {
    RegistrationType = 1,
    Student = 2,
    Guardian = 3,
    Camp = 4,
    Medical = 5,
    Review = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstitutionStep {
    RegistrationType = 1,
    Institution = 2,
    Camp = 3,
    Medical = 4,
    Review = 5,
}

impl IndividualStep {
    pub const LAST: Self = Self::Review;

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Some(match n {
            1 => Self::RegistrationType,
            2 => Self::Student,
            3 => Self::Guardian,
            4 => Self::Camp,
            5 => Self::Medical,
            6 => Self::Review,
            _ => return None,
        })
    }

    fn next(self) -> Self {
        Self::from_number(self.number() + 1).unwrap_or(Self::LAST)
    }

    fn previous(self) -> Self {
        Self::from_number(self.number().saturating_sub(1)).unwrap_or(Self::RegistrationType)
    }
}

impl InstitutionStep {
    pub const LAST: Self = Self::Review;

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Some(match n {
            1 => Self::RegistrationType,
            2 => Self::Institution,
            3 => Self::Camp,
            4 => Self::Medical,
            5 => Self::Review,
            _ => return None,
        })
    }

    fn next(self) -> Self {
        Self::from_number(self.number() + 1).unwrap_or(Self::LAST)
    }

    fn previous(self) -> Self {
        Self::from_number(self.number().saturating_sub(1)).unwrap_or(Self::RegistrationType)
    }
}

// ─────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn individual_missing(step: IndividualStep, draft: &RegistrationDraft) -> Vec<&'static str> {
    let mut missing = Vec::new();
    match step {
        IndividualStep::Student => {
            let s = &draft.student;
            if blank(&s.student_name) {
                missing.push("studentName");
            }
            if s.age.is_none() {
                missing.push("age");
            }
            if blank(&s.grade) {
                missing.push("grade");
            }
        }
        IndividualStep::Guardian => {
            let g = &draft.guardian;
            if blank(&g.parent_name) {
                missing.push("parentName");
            }
            if blank(&g.email) {
                missing.push("email");
            }
            if blank(&g.phone) {
                missing.push("phone");
            }
        }
        // The branch is the variant and the camp type always has a value.
        IndividualStep::RegistrationType
        | IndividualStep::Camp
        | IndividualStep::Medical
        | IndividualStep::Review => {}
    }
    missing
}

fn institution_missing(step: InstitutionStep, draft: &RegistrationDraft) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if step == InstitutionStep::Institution {
        let i = &draft.institution;
        let checks: [(&'static str, bool); 9] = [
            ("institutionName", blank(&i.institution_name)),
            ("institutionType", i.institution_type.is_none()),
            ("contactPersonName", blank(&i.contact_person_name)),
            ("contactPersonTitle", blank(&i.contact_person_title)),
            ("institutionEmail", blank(&i.institution_email)),
            ("institutionPhone", blank(&i.institution_phone)),
            ("numberOfStudents", i.number_of_students.is_none()),
            ("ageRangeMin", i.age_range_min.is_none()),
            ("ageRangeMax", i.age_range_max.is_none()),
        ];
        missing.extend(checks.iter().filter(|(_, m)| *m).map(|(name, _)| *name));
    }
    missing
}

// ─────────────────────────────────────────────────────────
// State & reducer
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum WizardState {
    Individual {
        step: IndividualStep,
        draft: RegistrationDraft,
    },
    Institution {
        step: InstitutionStep,
        draft: RegistrationDraft,
    },
}

/// A single field edit. Text fields replace the previous value.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftEdit {
    StudentName(String),
    Age(Option<u8>),
    Grade(String),
    School(String),
    Experience(ExperienceLevel),
    ParentName(String),
    Email(String),
    Phone(String),
    Address(String),
    InstitutionName(String),
    InstitutionType(Option<InstitutionType>),
    ContactPersonName(String),
    ContactPersonTitle(String),
    InstitutionEmail(String),
    InstitutionPhone(String),
    InstitutionAddress(String),
    NumberOfStudents(Option<StudentCount>),
    AgeRangeMin(Option<u8>),
    AgeRangeMax(Option<u8>),
    PreferredProgram(Option<ProgramFormat>),
    CampType(CampKey),
    MedicalConditions(String),
}

impl DraftEdit {
    fn apply(self, draft: &mut RegistrationDraft) {
        let (s, g, i) = (
            &mut draft.student,
            &mut draft.guardian,
            &mut draft.institution,
        );
        match self {
            Self::StudentName(v) => s.student_name = v,
            Self::Age(v) => s.age = v,
            Self::Grade(v) => s.grade = v,
            Self::School(v) => s.school = v,
            Self::Experience(v) => s.experience = v,
            Self::ParentName(v) => g.parent_name = v,
            Self::Email(v) => g.email = v,
            Self::Phone(v) => g.phone = v,
            Self::Address(v) => g.address = v,
            Self::InstitutionName(v) => i.institution_name = v,
            Self::InstitutionType(v) => i.institution_type = v,
            Self::ContactPersonName(v) => i.contact_person_name = v,
            Self::ContactPersonTitle(v) => i.contact_person_title = v,
            Self::InstitutionEmail(v) => i.institution_email = v,
            Self::InstitutionPhone(v) => i.institution_phone = v,
            Self::InstitutionAddress(v) => i.institution_address = v,
            Self::NumberOfStudents(v) => i.number_of_students = v,
            Self::AgeRangeMin(v) => i.age_range_min = v,
            Self::AgeRangeMax(v) => i.age_range_max = v,
            Self::PreferredProgram(v) => i.preferred_program = v,
            Self::CampType(v) => draft.camp_type = v,
            Self::MedicalConditions(v) => draft.medical_conditions = v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    /// Only honoured on step 1; never advances.
    SelectType(RegistrationType),
    Edit(DraftEdit),
    Next,
    Previous,
}

impl WizardState {
    pub fn new(branch: RegistrationType, draft: RegistrationDraft) -> Self {
        match branch {
            RegistrationType::Individual => Self::Individual {
                step: IndividualStep::RegistrationType,
                draft,
            },
            RegistrationType::Institution => Self::Institution {
                step: InstitutionStep::RegistrationType,
                draft,
            },
        }
    }

    /// Initial state from the `camp` and `type` navigation parameters.
    /// Missing or unknown values fall back to the one-day camp and the
    /// individual branch.
    pub fn from_query(camp: Option<&str>, registration_type: Option<&str>) -> Self {
        let camp_type = match camp {
            Some(raw) => CampKey::from_param(raw).unwrap_or_else(|| {
                warn!("Unknown camp '{raw}' requested; defaulting to one-day");
                CampKey::OneDay
            }),
            None => CampKey::OneDay,
        };
        let branch = registration_type
            .and_then(RegistrationType::from_param)
            .unwrap_or_default();
        Self::new(branch, RegistrationDraft::for_camp(camp_type))
    }

    pub fn branch(&self) -> RegistrationType {
        match self {
            Self::Individual { .. } => RegistrationType::Individual,
            Self::Institution { .. } => RegistrationType::Institution,
        }
    }

    pub fn draft(&self) -> &RegistrationDraft {
        match self {
            Self::Individual { draft, .. } | Self::Institution { draft, .. } => draft,
        }
    }

    pub fn step_number(&self) -> u8 {
        match self {
            Self::Individual { step, .. } => step.number(),
            Self::Institution { step, .. } => step.number(),
        }
    }

    pub fn total_steps(&self) -> u8 {
        match self {
            Self::Individual { .. } => IndividualStep::LAST.number(),
            Self::Institution { .. } => InstitutionStep::LAST.number(),
        }
    }

    pub fn is_final_step(&self) -> bool {
        self.step_number() == self.total_steps()
    }

    /// Required fields of `step` (in this branch) that are still empty.
    /// Steps outside the branch's range have no requirements.
    pub fn missing_fields(&self, step: u8) -> Vec<&'static str> {
        match self {
            Self::Individual { draft, .. } => IndividualStep::from_number(step)
                .map(|s| individual_missing(s, draft))
                .unwrap_or_default(),
            Self::Institution { draft, .. } => InstitutionStep::from_number(step)
                .map(|s| institution_missing(s, draft))
                .unwrap_or_default(),
        }
    }

    pub fn validate_step(&self, step: u8) -> bool {
        self.missing_fields(step).is_empty()
    }

    pub fn can_advance(&self) -> bool {
        !self.is_final_step() && self.validate_step(self.step_number())
    }

    fn into_draft(self) -> RegistrationDraft {
        match self {
            Self::Individual { draft, .. } | Self::Institution { draft, .. } => draft,
        }
    }
}

/// Pure transition function. Disallowed actions return the state unchanged.
pub fn reduce(state: WizardState, action: WizardAction) -> WizardState {
    match action {
        WizardAction::SelectType(branch) => {
            if state.step_number() != 1 || state.branch() == branch {
                return state;
            }
            WizardState::new(branch, state.into_draft())
        }
        WizardAction::Edit(edit) => match state {
            WizardState::Individual { step, mut draft } => {
                edit.apply(&mut draft);
                WizardState::Individual { step, draft }
            }
            WizardState::Institution { step, mut draft } => {
                edit.apply(&mut draft);
                WizardState::Institution { step, draft }
            }
        },
        WizardAction::Next => {
            if !state.validate_step(state.step_number()) {
                return state;
            }
            match state {
                WizardState::Individual { step, draft } => WizardState::Individual {
                    step: step.next(),
                    draft,
                },
                WizardState::Institution { step, draft } => WizardState::Institution {
                    step: step.next(),
                    draft,
                },
            }
        }
        WizardAction::Previous => match state {
            WizardState::Individual { step, draft } => WizardState::Individual {
                step: step.previous(),
                draft,
            },
            WizardState::Institution { step, draft } => WizardState::Institution {
                step: step.previous(),
                draft,
            },
        },
    }
}

// ─────────────────────────────────────────────────────────
// Submission lifecycle
// ─────────────────────────────────────────────────────────

/// One user's registration session.
#[derive(Debug)]
pub struct Wizard {
    state: WizardState,
    submitting: bool,
    submitted: Option<DocumentId>,
}

impl Wizard {
    pub fn new(state: WizardState) -> Self {
        Self {
            state,
            submitting: false,
            submitted: None,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Id of the stored record once the registration went through.
    pub fn submitted(&self) -> Option<&DocumentId> {
        self.submitted.as_ref()
    }

    /// Apply `action`. Ignored once submitted or while a submission is
    /// outstanding.
    pub fn dispatch(&mut self, action: WizardAction) {
        if self.submitting || self.submitted.is_some() {
            return;
        }
        let state = std::mem::replace(
            &mut self.state,
            WizardState::new(RegistrationType::Individual, RegistrationDraft::default()),
        );
        self.state = reduce(state, action);
    }

    /// Replay `Next` until the review step, stopping at the first step that
    /// does not validate.
    pub fn advance_to_review(&mut self) -> Result<(), SubmitError> {
        while !self.state.is_final_step() {
            let step = self.state.step_number();
            let missing = self.state.missing_fields(step);
            if !missing.is_empty() {
                return Err(SubmitError::Incomplete { step, missing });
            }
            self.dispatch(WizardAction::Next);
        }
        Ok(())
    }

    /// Enter the submitting state and freeze the draft into a record.
    pub fn begin_submit(&mut self) -> Result<RegistrationRecord, SubmitError> {
        if self.submitted.is_some() {
            return Err(SubmitError::AlreadySubmitted);
        }
        if self.submitting {
            return Err(SubmitError::InProgress);
        }
        if !self.state.is_final_step() {
            return Err(SubmitError::NotAtFinalStep {
                step: self.state.step_number(),
            });
        }
        self.submitting = true;
        Ok(RegistrationRecord::from_draft(
            self.state.branch(),
            self.state.draft(),
            Utc::now(),
        ))
    }

    /// Settle a submission started with [`Wizard::begin_submit`]. A failure
    /// leaves step and draft as they were so the user can retry.
    pub fn finish_submit(&mut self, outcome: &Result<DocumentId, SubmitError>) {
        self.submitting = false;
        if let Ok(id) = outcome {
            self.submitted = Some(id.clone());
        }
    }

    /// Append the registration to the record store.
    pub async fn submit(
        &mut self,
        store: &dyn RecordStore,
        deadline: Duration,
        idempotency_key: Option<&str>,
    ) -> Result<DocumentId, SubmitError> {
        let record = self.begin_submit()?;
        let outcome = persist(store, &record, idempotency_key, deadline).await;

        match &outcome {
            Ok(id) => info!(
                "Registration {id} stored ({}, {})",
                record.applicant.registration_type().as_str(),
                record.camp_type.as_str()
            ),
            Err(e) => error!("Registration submission failed: {e}"),
        }
        self.finish_submit(&outcome);
        outcome
    }
}

async fn persist(
    store: &dyn RecordStore,
    record: &RegistrationRecord,
    idempotency_key: Option<&str>,
    deadline: Duration,
) -> Result<DocumentId, SubmitError> {
    let body = serde_json::to_value(record).map_err(StorefrontError::from)?;
    let id = store::append_within(
        store,
        Collection::Registrations,
        body,
        idempotency_key,
        deadline,
    )
    .await?;
    Ok(id)
}
