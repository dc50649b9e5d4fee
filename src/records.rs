//! Student and subject documents.
//!
//! These are the shapes the API layer validates before anything reaches
//! the store. The store itself only sees JSON; field names on the wire are
//! camelCase.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::kv::{Document, ImportEntry};

/// A document that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Logical collections sharing the flat keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Students,
    Subjects,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Students, Collection::Subjects];

    /// Key prefix for documents of this collection.
    pub fn prefix(&self) -> &'static str {
        match self {
            Collection::Students => "student:",
            Collection::Subjects => "subject:",
        }
    }

    /// Store key for a document id.
    pub fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix(), id)
    }

    /// Plural name, as used in URLs and export payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Subjects => "subjects",
        }
    }

    /// Human-readable singular, for messages.
    pub fn singular(&self) -> &'static str {
        match self {
            Collection::Students => "Student",
            Collection::Subjects => "Subject",
        }
    }

    pub fn prefixes() -> [&'static str; 2] {
        Self::ALL.map(|c| c.prefix())
    }
}

/// Behaviour shared by the stored record types.
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// Creation payload.
    type New: DeserializeOwned + Send;
    /// Partial update payload.
    type Patch: DeserializeOwned + Send;
    /// Bulk import row.
    type Import: DeserializeOwned + Send;

    const COLLECTION: Collection;

    /// Build a new record with the given id, stamped at `now`.
    fn create(id: String, new: Self::New, now: DateTime<Utc>) -> Self;

    /// Merge a patch into this record. The id never changes.
    fn apply(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    /// Check field constraints.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Validate an import row and turn it into a store entry.
    fn import_entry(row: Self::Import, now: DateTime<Utc>) -> Result<ImportEntry, ValidationError>;

    fn id(&self) -> &str;

    fn to_document(&self) -> Result<Document, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(document)
    }
}

fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

fn require_range(field: &str, value: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::new(
            field,
            format!("must be between {} and {}, got {}", min, max, value),
        ));
    }
    Ok(())
}

// Subjects

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub code: String,
    pub credits: u32,
    pub semester: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub name: String,
    pub code: String,
    pub credits: u32,
    pub semester: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: Option<u32>,
    pub semester: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectImport {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub subject: NewSubject,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Subject {
    type New = NewSubject;
    type Patch = SubjectPatch;
    type Import = SubjectImport;

    const COLLECTION: Collection = Collection::Subjects;

    fn create(id: String, new: NewSubject, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            code: new.code,
            credits: new.credits,
            semester: new.semester,
            created_at: Some(now),
        }
    }

    fn apply(&mut self, patch: SubjectPatch, _now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(code) = patch.code {
            self.code = code;
        }
        if let Some(credits) = patch.credits {
            self.credits = credits;
        }
        if let Some(semester) = patch.semester {
            self.semester = semester;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("code", &self.code)?;
        require_range("credits", self.credits, 1, 10)?;
        require_range("semester", self.semester, 1, 8)
    }

    fn import_entry(row: SubjectImport, now: DateTime<Utc>) -> Result<ImportEntry, ValidationError> {
        let mut subject = Subject::create(row.id.clone().unwrap_or_default(), row.subject, now);
        subject.created_at = row.created_at.or(Some(now));
        subject.validate()?;
        to_import_entry(row.id, &subject)
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// The subjects written by the seed operation.
pub fn default_subjects() -> Vec<NewSubject> {
    [
        ("Object Oriented Programming", "CS301", 4, 3),
        ("Data Structures & Algorithms", "CS302", 4, 3),
        ("Operating Systems", "CS303", 4, 3),
        ("Computer Networks", "CS304", 3, 3),
        ("Database Management Systems", "CS305", 4, 4),
        ("Software Engineering", "CS306", 3, 4),
        ("Web Technologies", "CS307", 3, 4),
        ("Computer Architecture", "CS308", 3, 4),
    ]
    .into_iter()
    .map(|(name, code, credits, semester)| NewSubject {
        name: name.to_string(),
        code: code.to_string(),
        credits,
        semester,
    })
    .collect()
}

// Students

/// Marks obtained by a student in one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubject {
    pub subject_id: String,
    pub marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    pub roll_number: String,
    pub department: String,
    pub semester: u32,
    pub year: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub subjects: Vec<StudentSubject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub roll_number: String,
    pub department: String,
    pub semester: u32,
    pub year: u32,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub subjects: Vec<StudentSubject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub roll_number: Option<String>,
    pub department: Option<String>,
    pub semester: Option<u32>,
    pub year: Option<u32>,
    // Contact fields: absent keeps the stored value, `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub date_of_birth: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub guardian_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub guardian_phone: Option<Option<String>>,
    pub subjects: Option<Vec<StudentSubject>>,
}

/// Maps a present field to `Some`, so an explicit `null` becomes `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentImport {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub student: NewStudent,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Student {
    type New = NewStudent;
    type Patch = StudentPatch;
    type Import = StudentImport;

    const COLLECTION: Collection = Collection::Students;

    fn create(id: String, new: NewStudent, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            email: new.email,
            roll_number: new.roll_number,
            department: new.department,
            semester: new.semester,
            year: new.year,
            phone_number: new.phone_number,
            date_of_birth: new.date_of_birth,
            address: new.address,
            guardian_name: new.guardian_name,
            guardian_phone: new.guardian_phone,
            subjects: new.subjects,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    fn apply(&mut self, patch: StudentPatch, now: DateTime<Utc>) {
        let StudentPatch {
            name,
            email,
            roll_number,
            department,
            semester,
            year,
            phone_number,
            date_of_birth,
            address,
            guardian_name,
            guardian_phone,
            subjects,
        } = patch;

        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = email {
            self.email = v;
        }
        if let Some(v) = roll_number {
            self.roll_number = v;
        }
        if let Some(v) = department {
            self.department = v;
        }
        if let Some(v) = semester {
            self.semester = v;
        }
        if let Some(v) = year {
            self.year = v;
        }
        if let Some(v) = subjects {
            self.subjects = v;
        }
        if let Some(v) = phone_number {
            self.phone_number = v;
        }
        if let Some(v) = date_of_birth {
            self.date_of_birth = v;
        }
        if let Some(v) = address {
            self.address = v;
        }
        if let Some(v) = guardian_name {
            self.guardian_name = v;
        }
        if let Some(v) = guardian_phone {
            self.guardian_phone = v;
        }
        self.updated_at = Some(now);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ValidationError::new("email", "must contain '@'"));
        }
        require("rollNumber", &self.roll_number)?;
        require("department", &self.department)?;
        require_range("semester", self.semester, 1, 8)?;
        if self.year == 0 {
            return Err(ValidationError::new("year", "must be positive"));
        }
        for (i, s) in self.subjects.iter().enumerate() {
            require(&format!("subjects[{}].subjectId", i), &s.subject_id)?;
            if !s.marks.is_finite() || !(0.0..=100.0).contains(&s.marks) {
                return Err(ValidationError::new(
                    format!("subjects[{}].marks", i),
                    format!("must be between 0 and 100, got {}", s.marks),
                ));
            }
        }
        Ok(())
    }

    fn import_entry(row: StudentImport, now: DateTime<Utc>) -> Result<ImportEntry, ValidationError> {
        let mut student = Student::create(row.id.clone().unwrap_or_default(), row.student, now);
        student.created_at = row.created_at.or(Some(now));
        student.updated_at = row.updated_at.or(Some(now));
        student.validate()?;
        to_import_entry(row.id, &student)
    }

    fn id(&self) -> &str {
        &self.id
    }
}

fn to_import_entry<R: Record>(id: Option<String>, record: &R) -> Result<ImportEntry, ValidationError> {
    let document = record
        .to_document()
        .map_err(|e| ValidationError::new("document", e.to_string()))?;
    Ok(ImportEntry { id, document })
}

/// A full export, or an import request: every collection's rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub students: Vec<StudentImport>,
    #[serde(default)]
    pub subjects: Vec<SubjectImport>,
}

/// Validated store entries for each collection of a [`Dataset`].
#[derive(Debug, Default)]
pub struct DatasetEntries {
    pub students: Vec<ImportEntry>,
    pub subjects: Vec<ImportEntry>,
}

impl Dataset {
    /// Read a dataset from a JSON file, e.g. one written by an export.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Validate every row. Either all rows are valid or every failing row
    /// is reported, with its field path prefixed by collection and index.
    pub fn into_entries(self, now: DateTime<Utc>) -> Result<DatasetEntries, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let students = validate_rows::<Student>(self.students, now, &mut errors);
        let subjects = validate_rows::<Subject>(self.subjects, now, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(DatasetEntries { students, subjects })
    }
}

fn validate_rows<R: Record>(
    rows: Vec<R::Import>,
    now: DateTime<Utc>,
    errors: &mut Vec<ValidationError>,
) -> Vec<ImportEntry> {
    let name = R::COLLECTION.name();
    rows.into_iter()
        .enumerate()
        .filter_map(|(i, row)| match R::import_entry(row, now) {
            Ok(entry) => Some(entry),
            Err(e) => {
                errors.push(ValidationError::new(
                    format!("{}[{}].{}", name, i, e.field),
                    e.message,
                ));
                None
            }
        })
        .collect()
}

/// Store entries for the default subjects, each with a fresh id.
pub fn seed_entries(now: DateTime<Utc>) -> Result<Vec<ImportEntry>, ValidationError> {
    default_subjects()
        .into_iter()
        .map(|subject| {
            Subject::import_entry(
                SubjectImport {
                    id: None,
                    subject,
                    created_at: None,
                },
                now,
            )
        })
        .collect()
}
