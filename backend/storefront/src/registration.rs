//! Camp registration data: the in-progress draft and the record that is
//! appended to the `registrations` collection.
//!
//! The draft is flat on the wire (camelCase, every field optional) so a form
//! can post it as-is. The record keeps only the fields of the chosen branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CampKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationType {
    #[default]
    Individual,
    Institution,
}

impl RegistrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Institution => "institution",
        }
    }

    /// Parse the `type` query parameter; anything unrecognised is `None`.
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw.trim() {
            "individual" => Some(Self::Individual),
            "institution" => Some(Self::Institution),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Some,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstitutionType {
    PublicSchool,
    PrivateSchool,
    InternationalSchool,
    CoachingCenter,
    University,
    Ngo,
    Other,
}

/// Bucketed head-count of an institution's group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentCount {
    #[serde(rename = "5-10")]
    FiveToTen,
    #[serde(rename = "11-20")]
    ElevenToTwenty,
    #[serde(rename = "21-30")]
    TwentyOneToThirty,
    #[serde(rename = "31-50")]
    ThirtyOneToFifty,
    #[serde(rename = "51+")]
    FiftyOnePlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramFormat {
    OnSite,
    OurCenter,
    Hybrid,
    Virtual,
}

/// Ages offered by the age selectors.
pub const MIN_AGE: u8 = 8;
pub const MAX_AGE: u8 = 20;

/// Inclusive bounds for an age selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

pub const AGE_OPTIONS: AgeRange = AgeRange {
    min: MIN_AGE,
    max: MAX_AGE,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentDetails {
    pub student_name: String,
    pub age: Option<u8>,
    pub grade: String,
    pub school: String,
    pub experience: ExperienceLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardianContact {
    pub parent_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstitutionDetails {
    pub institution_name: String,
    pub institution_type: Option<InstitutionType>,
    pub contact_person_name: String,
    pub contact_person_title: String,
    pub institution_email: String,
    pub institution_phone: String,
    pub institution_address: String,
    pub number_of_students: Option<StudentCount>,
    pub age_range_min: Option<u8>,
    pub age_range_max: Option<u8>,
    pub preferred_program: Option<ProgramFormat>,
}

/// Everything the wizard collects, for both branches. Which half ends up in
/// the submitted record is decided by the wizard's branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationDraft {
    #[serde(flatten)]
    pub student: StudentDetails,
    #[serde(flatten)]
    pub guardian: GuardianContact,
    #[serde(flatten)]
    pub institution: InstitutionDetails,
    pub camp_type: CampKey,
    pub medical_conditions: String,
}

impl RegistrationDraft {
    pub fn for_camp(camp_type: CampKey) -> Self {
        Self {
            camp_type,
            ..Self::default()
        }
    }
}

// ─────────────────────────────────────────────────────────
// Submitted record
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualApplicant {
    #[serde(flatten)]
    pub student: StudentDetails,
    #[serde(flatten)]
    pub guardian: GuardianContact,
}

/// The populated branch of a registration. Exactly one exists per record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "registrationType", rename_all = "lowercase")]
pub enum Applicant {
    Individual(IndividualApplicant),
    Institution(InstitutionDetails),
}

impl Applicant {
    pub fn registration_type(&self) -> RegistrationType {
        match self {
            Self::Individual(_) => RegistrationType::Individual,
            Self::Institution(_) => RegistrationType::Institution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    #[serde(flatten)]
    pub applicant: Applicant,
    pub camp_type: CampKey,
    pub camp_name: String,
    pub medical_conditions: String,
    pub submitted_at: DateTime<Utc>,
}

impl RegistrationRecord {
    /// Freeze a draft into a record for `branch`, dropping the other
    /// branch's fields.
    pub fn from_draft(
        branch: RegistrationType,
        draft: &RegistrationDraft,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let applicant = match branch {
            RegistrationType::Individual => Applicant::Individual(IndividualApplicant {
                student: draft.student.clone(),
                guardian: draft.guardian.clone(),
            }),
            RegistrationType::Institution => Applicant::Institution(draft.institution.clone()),
        };
        RegistrationRecord {
            applicant,
            camp_type: draft.camp_type,
            camp_name: draft.camp_type.entry().name.to_string(),
            medical_conditions: draft.medical_conditions.clone(),
            submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_draft() -> RegistrationDraft {
        let mut draft = RegistrationDraft::for_camp(CampKey::TwoDay);
        draft.student.student_name = "Asha".into();
        draft.student.age = Some(10);
        draft.student.grade = "5th".into();
        draft.guardian.parent_name = "Meera".into();
        draft.guardian.email = "meera@example.com".into();
        draft.guardian.phone = "9876543210".into();
        draft.institution.institution_name = "Sunrise Public School".into();
        draft.institution.number_of_students = Some(StudentCount::TwentyOneToThirty);
        draft
    }

    #[test]
    fn draft_deserializes_from_flat_form() {
        let json = serde_json::json!({
            "studentName": "Asha",
            "age": 10,
            "grade": "5th",
            "institutionType": "coaching-center",
            "numberOfStudents": "51+",
            "campType": "online"
        });
        let draft: RegistrationDraft = serde_json::from_value(json).unwrap();
        assert_eq!(draft.student.student_name, "Asha");
        assert_eq!(draft.student.age, Some(10));
        assert_eq!(draft.student.experience, ExperienceLevel::Beginner);
        assert_eq!(
            draft.institution.institution_type,
            Some(InstitutionType::CoachingCenter)
        );
        assert_eq!(
            draft.institution.number_of_students,
            Some(StudentCount::FiftyOnePlus)
        );
        assert_eq!(draft.camp_type, CampKey::Online);
    }

    #[test]
    fn individual_record_omits_institution_fields() {
        let record =
            RegistrationRecord::from_draft(RegistrationType::Individual, &filled_draft(), Utc::now());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["registrationType"], "individual");
        assert_eq!(json["studentName"], "Asha");
        assert_eq!(json["parentName"], "Meera");
        assert_eq!(json["campName"], "Two-Day Robotics Camp");
        assert!(json.get("institutionName").is_none());
        assert!(json.get("numberOfStudents").is_none());
    }

    #[test]
    fn institution_record_omits_individual_fields() {
        let record = RegistrationRecord::from_draft(
            RegistrationType::Institution,
            &filled_draft(),
            Utc::now(),
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["registrationType"], "institution");
        assert_eq!(json["institutionName"], "Sunrise Public School");
        assert_eq!(json["numberOfStudents"], "21-30");
        assert!(json.get("studentName").is_none());
        assert!(json.get("parentName").is_none());
        assert_eq!(record.applicant.registration_type(), RegistrationType::Institution);
    }

    #[test]
    fn registration_type_params() {
        assert_eq!(
            RegistrationType::from_param("institution"),
            Some(RegistrationType::Institution)
        );
        assert_eq!(RegistrationType::from_param("school"), None);
    }
}
