//! Fixtures shared by unit tests: document builders and in-memory fakes.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use uuid::Uuid;

use crate::llm_client::LlmError;
use crate::models::profile::ProfileRow;
use crate::resume::fields::{FieldParser, ParseError, ParsedFields};
use crate::resume::store::{ProfileStore, StoreError};

/// Minimal DOCX: one `<w:p>` per entry, one `<w:r><w:t>` per run.
pub fn docx_bytes(paragraphs: &[&[&str]]) -> Vec<u8> {
    let mut body = String::new();
    for runs in paragraphs {
        body.push_str("<w:p>");
        for run in *runs {
            body.push_str(&format!(
                r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{run}</w:t></w:r>"#
            ));
        }
        body.push_str("</w:p>");
    }
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        let options = zip::write::FileOptions::default();
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer
            .write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types/>"#)
            .unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf.into_inner()
}

/// Minimal PDF with one Courier text line per page.
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Profile store backed by a map. `failing()` rejects every write.
#[derive(Default)]
pub struct InMemoryProfileStore {
    rows: Mutex<HashMap<Uuid, ProfileRow>>,
    fail: bool,
}

impl InMemoryProfileStore {
    pub fn failing() -> Self {
        Self {
            rows: Mutex::default(),
            fail: true,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        file_path: &str,
        fields: &ParsedFields,
    ) -> Result<ProfileRow, StoreError> {
        if self.fail {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let created_at = rows.get(&user_id).map(|r| r.created_at).unwrap_or(now);
        let row = ProfileRow {
            user_id,
            resume_file_path: file_path.to_string(),
            name: fields.name.clone(),
            email: fields.email.clone(),
            phone: fields.phone.clone(),
            education: fields.education.clone(),
            experience: fields.experience.clone(),
            skills: fields.skills.clone(),
            created_at,
            updated_at: now,
        };
        rows.insert(user_id, row.clone());
        Ok(row)
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<ProfileRow>, StoreError> {
        Ok(self.rows.lock().unwrap().get(&user_id).cloned())
    }
}

#[derive(Debug)]
enum StubOutcome {
    Fields(ParsedFields),
    ApiFailure(u16, String),
}

/// Field parser with a scripted outcome. Clones share state and recorded inputs.
#[derive(Clone)]
pub struct StubFieldParser {
    outcome: Arc<Mutex<StubOutcome>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubFieldParser {
    pub fn returning(fields: ParsedFields) -> Self {
        Self {
            outcome: Arc::new(Mutex::new(StubOutcome::Fields(fields))),
            seen: Arc::default(),
        }
    }

    pub fn set_fields(&self, fields: ParsedFields) {
        *self.outcome.lock().unwrap() = StubOutcome::Fields(fields);
    }

    pub fn set_api_failure(&self, status: u16, message: &str) {
        *self.outcome.lock().unwrap() = StubOutcome::ApiFailure(status, message.to_string());
    }

    pub fn seen_texts(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl FieldParser for StubFieldParser {
    async fn parse(&self, raw_text: &str) -> Result<ParsedFields, ParseError> {
        self.seen.lock().unwrap().push(raw_text.to_string());
        match &*self.outcome.lock().unwrap() {
            StubOutcome::Fields(fields) => Ok(fields.clone()),
            StubOutcome::ApiFailure(status, message) => {
                Err(ParseError::Completion(LlmError::Api {
                    status: *status,
                    message: message.clone(),
                }))
            }
        }
    }
}
