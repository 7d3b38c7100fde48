//! # Language Module
//!
//! Helpers that do not depend on any particular language live here:
//! line-oriented text storage, range arithmetic on `lsp_types` positions,
//! and the JSON helpers the settings parsers use.
//! Language specific services are in the submodules.

pub mod hlasm;

use lsp_types as lsp;
use thiserror::Error;

#[derive(Error,Debug)]
pub enum Error {
    #[error("Settings could not be interpreted")]
    BadSettings
}

/// Immutable text buffer with an index of line starts.
/// Positions are 0-based line and column, columns count characters.
#[derive(Clone,Debug)]
pub struct TextData {
    text: String,
    line_starts: Vec<usize>
}

impl TextData {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i,c) in text.char_indices() {
            if c=='\n' {
                line_starts.push(i+1);
            }
        }
        Self {
            text: text.to_string(),
            line_starts
        }
    }
    pub fn number_of_lines(&self) -> usize {
        self.line_starts.len()
    }
    /// Line `n` without its terminator, empty if out of range
    pub fn get_line(&self,n: usize) -> &str {
        if n >= self.line_starts.len() {
            return "";
        }
        let beg = self.line_starts[n];
        let end = match self.line_starts.get(n+1) {
            Some(e) => *e,
            None => self.text.len()
        };
        self.text[beg..end].trim_end_matches(&['\n','\r'][..])
    }
    /// Text of the line up to (not including) the column of `pos`
    pub fn get_line_beginning(&self,pos: &lsp::Position) -> &str {
        let line = self.get_line(pos.line as usize);
        match line.char_indices().nth(pos.character as usize) {
            Some((i,_)) => &line[0..i],
            None => line
        }
    }
    /// Character just before `pos`, or a space at the start of a line
    pub fn get_character_before(&self,pos: &lsp::Position) -> char {
        match self.get_line_beginning(pos).chars().last() {
            Some(c) => c,
            None => ' '
        }
    }
}

pub fn range_contains_pos(rng: &lsp::Range,pos: &lsp::Position) -> bool {
    if pos.line < rng.start.line || pos.line > rng.end.line {
        return false;
    }
    if pos.line == rng.start.line && pos.character < rng.start.character {
        return false;
    }
    if pos.line == rng.end.line && pos.character > rng.end.character {
        return false;
    }
    true
}

/// If `key` is a boolean in `maybe_obj`, put it in `curr`
pub fn update_json_bool(maybe_obj: &serde_json::Value, key: &str, curr: &mut bool) {
    if let serde_json::Value::Object(obj) = maybe_obj {
        if let Some(serde_json::Value::Bool(x)) = obj.get(key) {
            *curr = *x;
        }
    }
}

/// If `key` is an integer in `maybe_obj`, put it in `curr`
pub fn update_json_i64(maybe_obj: &serde_json::Value, key: &str, curr: &mut i64) {
    if let serde_json::Value::Object(obj) = maybe_obj {
        if let Some(x) = obj.get(key).and_then(|v| v.as_i64()) {
            *curr = x;
        }
    }
}

/// If `key` is a string in `maybe_obj`, put it in `curr`
pub fn update_json_string(maybe_obj: &serde_json::Value, key: &str, curr: &mut String) {
    if let serde_json::Value::Object(obj) = maybe_obj {
        if let Some(serde_json::Value::String(x)) = obj.get(key) {
            *curr = x.to_string();
        }
    }
}

/// If `key` is an array of strings in `maybe_obj`, replace `curr` with it.
/// Non-string elements are skipped.
pub fn update_json_vec_str(maybe_obj: &serde_json::Value, key: &str, curr: &mut Vec<String>) {
    if let serde_json::Value::Object(obj) = maybe_obj {
        if let Some(serde_json::Value::Array(list)) = obj.get(key) {
            *curr = Vec::new();
            for item in list {
                if let serde_json::Value::String(s) = item {
                    curr.push(s.to_string());
                }
            }
        }
    }
}
