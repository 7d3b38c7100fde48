//! Per-file view of the index: its text, the occurrences found in it and the
//! slices that belong to macro definitions.

use std::rc::Rc;
use lsp_types as lsp;
use crate::lang::{TextData,range_contains_pos};
use super::super::macros::{CopyMember,MacroDefinition};
use super::{MacroInfoPtr,MacroSlice,SymbolOccurrence};

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum FileType {
    Opencode,
    Macro,
    Copy
}

/// What the file defines
#[derive(Clone,Debug)]
pub enum FileOwner {
    Opencode,
    Macro(Rc<MacroDefinition>),
    Copy(Rc<CopyMember>)
}

/// Lines `begin_line..end_line` belong to the macro in `macro_context`
#[derive(Clone)]
pub struct FileSlice {
    pub begin_line: u32,
    pub end_line: u32,
    pub macro_context: MacroInfoPtr
}

pub struct FileInfo {
    pub name: String,
    pub file_type: FileType,
    pub owner: FileOwner,
    pub data: TextData,
    pub occurrences: Vec<SymbolOccurrence>,
    pub slices: Vec<FileSlice>
}

impl FileInfo {
    pub fn new(name: &str,file_type: FileType,owner: FileOwner,text: &str) -> Self {
        Self {
            name: name.to_string(),
            file_type,
            owner,
            data: TextData::new(text),
            occurrences: Vec::new(),
            slices: Vec::new()
        }
    }
    /// Add occurrences, skipping any that are already recorded
    pub fn update_occurrences(&mut self,occs: &[SymbolOccurrence]) {
        for occ in occs {
            let dup = self.occurrences.iter().any(|o| o.range==occ.range && o.is_similar(occ));
            if !dup {
                self.occurrences.push(occ.clone());
            }
        }
    }
    pub fn update_slices(&mut self,slices: &[MacroSlice],macro_context: &MacroInfoPtr) {
        for s in slices {
            self.slices.push(FileSlice {
                begin_line: s.begin_line,
                end_line: s.end_line,
                macro_context: Rc::clone(macro_context)
            });
        }
    }
    /// Innermost macro whose slice contains the line, `None` means open code
    pub fn find_scope(&self,pos: &lsp::Position) -> Option<MacroInfoPtr> {
        let mut ans: Option<&FileSlice> = None;
        for s in &self.slices {
            if s.begin_line <= pos.line && pos.line < s.end_line {
                let better = match ans {
                    Some(best) => s.end_line - s.begin_line < best.end_line - best.begin_line,
                    None => true
                };
                if better {
                    ans = Some(s);
                }
            }
        }
        ans.map(|s| Rc::clone(&s.macro_context))
    }
    pub fn find_occurrence_with_scope(&self,pos: &lsp::Position) -> (Option<&SymbolOccurrence>,Option<MacroInfoPtr>) {
        let occ = self.occurrences.iter().find(|o| range_contains_pos(&o.range,pos));
        (occ,self.find_scope(pos))
    }
    /// Ranges of the occurrences in `occs` that denote the same symbol as `occ`
    pub fn find_references(occ: &SymbolOccurrence,occs: &[SymbolOccurrence]) -> Vec<lsp::Range> {
        occs.iter().filter(|o| o.is_similar(occ)).map(|o| o.range).collect()
    }
}
