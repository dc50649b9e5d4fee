//! Grade sheets and dashboard statistics derived from stored records.

use std::collections::HashMap;

use serde::Serialize;

use crate::records::{Student, Subject};

/// Minimum marks for a pass in a subject.
pub const PASS_MARKS: f64 = 40.0;

/// Letter grade for a mark out of 100.
pub fn grade_for(marks: f64) -> &'static str {
    match marks {
        m if m >= 90.0 => "A+",
        m if m >= 80.0 => "A",
        m if m >= 70.0 => "B+",
        m if m >= 60.0 => "B",
        m if m >= 50.0 => "C+",
        m if m >= PASS_MARKS => "C",
        _ => "F",
    }
}

fn average(marks: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let n = marks.len();
    if n == 0 {
        return None;
    }
    Some(marks.sum::<f64>() / n as f64)
}

/// One subject line of a grade sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRow {
    pub subject_id: String,
    /// `None` when the subject no longer exists.
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: u32,
    pub marks: f64,
    pub grade: &'static str,
    /// At least [`PASS_MARKS`].
    pub passed: bool,
}

/// Per-student summary: grades, average, GPA, credits and overall result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSheet {
    pub student_id: String,
    pub name: String,
    pub roll_number: String,
    pub rows: Vec<GradeRow>,
    pub average_marks: Option<f64>,
    /// Average marks on a 0-10 scale.
    pub gpa: Option<f64>,
    pub total_credits: u32,
    /// Every subject passed. A student with no subjects has passed.
    pub passed: bool,
}

impl GradeSheet {
    pub fn for_student(student: &Student, subjects: &[Subject]) -> Self {
        let by_id: HashMap<&str, &Subject> =
            subjects.iter().map(|s| (s.id.as_str(), s)).collect();

        let rows: Vec<GradeRow> = student
            .subjects
            .iter()
            .map(|taken| {
                let subject = by_id.get(taken.subject_id.as_str());
                GradeRow {
                    subject_id: taken.subject_id.clone(),
                    name: subject.map(|s| s.name.clone()),
                    code: subject.map(|s| s.code.clone()),
                    credits: subject.map(|s| s.credits).unwrap_or(0),
                    marks: taken.marks,
                    grade: grade_for(taken.marks),
                    passed: taken.marks >= PASS_MARKS,
                }
            })
            .collect();

        let average_marks = average(rows.iter().map(|r| r.marks));
        Self {
            student_id: student.id.clone(),
            name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            total_credits: rows.iter().map(|r| r.credits).sum(),
            passed: rows.iter().all(|r| r.passed),
            gpa: average_marks.map(|avg| avg / 10.0),
            average_marks,
            rows,
        }
    }
}

/// Totals shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: usize,
    pub total_subjects: usize,
    /// Mean of per-student averages. Students without subjects count as 0.
    pub average_marks: f64,
    /// Students with at least [`PASS_MARKS`] in every subject they take.
    pub passed_students: usize,
}

impl DashboardStats {
    pub fn compute(students: &[Student], subjects: &[Subject]) -> Self {
        let total: f64 = students
            .iter()
            .map(|s| average(s.subjects.iter().map(|t| t.marks)).unwrap_or(0.0))
            .sum();
        let average_marks = if students.is_empty() {
            0.0
        } else {
            total / students.len() as f64
        };

        Self {
            total_students: students.len(),
            total_subjects: subjects.len(),
            average_marks,
            passed_students: students
                .iter()
                .filter(|s| s.subjects.iter().all(|t| t.marks >= PASS_MARKS))
                .count(),
        }
    }
}
