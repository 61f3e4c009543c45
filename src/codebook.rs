//! Question texts with their answer scales, and persona system prompts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EvalError, Result};

const REQUIRED: [&str; 4] = ["Custom_variable_name", "Text", "Characteristic", "Value_labels"];

#[derive(Debug, Clone, PartialEq)]
pub struct CodebookEntry {
    pub text: String,
    /// Answer code -> label, in codebook order.
    pub options: Vec<(u32, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct Codebook {
    order: Vec<String>,
    entries: BTreeMap<String, CodebookEntry>,
}

impl Codebook {
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)
            .map_err(|e| EvalError::config(format!("cannot open codebook {}: {e}", path.display())))?;
        let headers = rdr.headers()?.clone();
        let mut cols = [0usize; 4];
        for (slot, name) in cols.iter_mut().zip(REQUIRED) {
            *slot = headers.iter().position(|h| h == name).ok_or_else(|| {
                EvalError::config(format!("codebook {} lacks column {name}", path.display()))
            })?;
        }

        let mut book = Codebook::default();
        for record in rdr.records() {
            let record = record?;
            let field = |i: usize| record.get(cols[i]).unwrap_or("");
            book.insert(field(0), field(1), field(2), field(3));
        }
        Ok(book)
    }

    /// Adds a question; `characteristics` and `labels` are comma lists zipped pairwise.
    pub fn insert(&mut self, name: &str, text: &str, characteristics: &str, labels: &str) {
        let options = characteristics
            .split(',')
            .zip(labels.split(','))
            .filter_map(|(code, label)| Some((code.trim().parse().ok()?, label.trim().to_owned())))
            .collect();
        if !self.entries.contains_key(name) {
            self.order.push(name.to_owned());
        }
        self.entries.insert(name.to_owned(), CodebookEntry { text: text.to_owned(), options });
    }

    /// Question ids in codebook order.
    pub fn questions(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, question: &str) -> Option<&CodebookEntry> {
        self.entries.get(question)
    }

    pub fn prompt(&self, question: &str) -> Result<String> {
        let entry = self
            .get(question)
            .ok_or_else(|| EvalError::config(format!("question {question} is not in the codebook")))?;
        let options = entry
            .options
            .iter()
            .map(|(code, label)| format!("{code}: {label}"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format!("{}\n\nResponse Options:\n{options}", entry.text))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Persona Prompt")]
    pub prompt: String,
}

#[derive(Debug, Clone, Default)]
pub struct Personas(Vec<Persona>);

impl Personas {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| EvalError::config(format!("cannot read personas {}: {e}", path.display())))?;
        let list: Vec<Persona> = serde_json::from_str(&data).map_err(|e| EvalError::json(path, e))?;
        Ok(Self(list))
    }

    pub fn get(&self, group: &str) -> Result<&str> {
        self.0
            .iter()
            .find(|p| p.group == group)
            .map(|p| p.prompt.as_str())
            .ok_or_else(|| EvalError::config(format!("no persona for group {group}")))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn prompt_lists_options_in_order() {
        let mut book = Codebook::default();
        book.insert("F1", "How much do you trust the government?", "1, 2,3,x", "Not at all,Somewhat, Fully,Refused");
        assert_eq!(
            book.prompt("F1").unwrap(),
            "How much do you trust the government?\n\nResponse Options:\n1: Not at all\n2: Somewhat\n3: Fully"
        );
    }

    #[test]
    fn unknown_question_is_config_error() {
        assert!(Codebook::default().prompt("F404").unwrap_err().is_fatal());
    }

    #[test]
    fn csv_needs_all_columns() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "Custom_variable_name,Text,Characteristic").unwrap();
        writeln!(f, "F1,Q?,1").unwrap();
        assert!(Codebook::from_csv(f.path()).unwrap_err().is_fatal());
    }

    #[test]
    fn csv_keeps_codebook_order() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "Custom_variable_name,Text,Characteristic,Value_labels").unwrap();
        writeln!(f, "F9,Second?,\"1,2\",\"Yes,No\"").unwrap();
        writeln!(f, "F1,First?,\"1,2\",\"Yes,No\"").unwrap();
        let book = Codebook::from_csv(f.path()).unwrap();
        assert_eq!(book.questions(), &["F9", "F1"]);
        assert_eq!(book.get("F1").unwrap().options, vec![(1, "Yes".to_string()), (2, "No".to_string())]);
    }

    #[test]
    fn personas_lookup() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"[{{"Group": "Jewish", "Persona Prompt": "You are a Jewish American."}}]"#).unwrap();
        let personas = Personas::load(f.path()).unwrap();
        assert_eq!(personas.get("Jewish").unwrap(), "You are a Jewish American.");
        assert!(personas.get("Amish").unwrap_err().is_fatal());
    }
}
