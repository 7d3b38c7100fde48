//! # Outline
//!
//! The outline of open code is assembled from the ordinary symbol table and the
//! processing stack each symbol was defined under.  A symbol defined by a macro call
//! or copy member is shown under synthetic `MACRO`/`COPY` nodes, one per nesting level.
//! Relocatable symbols go beneath their section, provided the section was started
//! along the same path or an enclosing one.
//!
//! Macro files list their parameters, variable declarations and sequence symbols,
//! copy files list the scoped symbols that occur in them.

use std::collections::{HashMap,HashSet};
use lsp_types as lsp;
use serde::Serialize;
use super::super::ids::Id;
use super::super::ordinary::{SectionId,SectionKind,Symbol,SymbolOrigin,SymbolValue};
use super::super::processing::{FileProcessingType,ProcessingFrame};
use super::super::macros::CopyNests;
use super::file_info::{FileInfo,FileType};
use super::{LspContext,MacroInfoPtr,OccurrenceKind};

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug,Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentSymbolKind {
    Dat,
    Equ,
    Mach,
    Unknown,
    Var,
    Seq,
    Common,
    Dummy,
    Executable,
    Readonly,
    Macro,
    Copy
}

impl DocumentSymbolKind {
    fn from_section(kind: SectionKind) -> Self {
        match kind {
            SectionKind::Common => Self::Common,
            SectionKind::Dummy => Self::Dummy,
            SectionKind::Executable => Self::Executable,
            SectionKind::Readonly => Self::Readonly
        }
    }
    fn from_origin(origin: SymbolOrigin) -> Self {
        match origin {
            SymbolOrigin::Dat => Self::Dat,
            SymbolOrigin::Equ => Self::Equ,
            SymbolOrigin::Mach => Self::Mach,
            SymbolOrigin::Sect | SymbolOrigin::Unknown => Self::Unknown
        }
    }
    pub fn to_lsp(&self) -> lsp::SymbolKind {
        match self {
            Self::Dat => lsp::SymbolKind::FIELD,
            Self::Equ => lsp::SymbolKind::CONSTANT,
            Self::Mach => lsp::SymbolKind::METHOD,
            Self::Unknown => lsp::SymbolKind::NULL,
            Self::Var => lsp::SymbolKind::VARIABLE,
            Self::Seq => lsp::SymbolKind::KEY,
            Self::Common => lsp::SymbolKind::NAMESPACE,
            Self::Dummy => lsp::SymbolKind::STRUCT,
            Self::Executable => lsp::SymbolKind::MODULE,
            Self::Readonly => lsp::SymbolKind::PACKAGE,
            Self::Macro => lsp::SymbolKind::FUNCTION,
            Self::Copy => lsp::SymbolKind::FILE
        }
    }
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dat => "DAT",
            Self::Equ => "EQU",
            Self::Mach => "MACH",
            Self::Unknown => "UNKNOWN",
            Self::Var => "VAR",
            Self::Seq => "SEQ",
            Self::Common => "COMMON",
            Self::Dummy => "DUMMY",
            Self::Executable => "EXECUTABLE",
            Self::Readonly => "READONLY",
            Self::Macro => "MACRO",
            Self::Copy => "COPY"
        }
    }
}

#[derive(Clone,PartialEq,Debug,Serialize)]
pub struct DocumentSymbolItem {
    pub name: String,
    pub kind: DocumentSymbolKind,
    pub range: lsp::Range,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentSymbolItem>
}

impl DocumentSymbolItem {
    pub fn new(name: &str,kind: DocumentSymbolKind,range: lsp::Range) -> Self {
        Self { name: name.to_string(), kind, range, children: Vec::new() }
    }
    pub fn with_children(name: &str,kind: DocumentSymbolKind,range: lsp::Range,children: Vec<DocumentSymbolItem>) -> Self {
        Self { name: name.to_string(), kind, range, children }
    }
    #[allow(deprecated)]
    pub fn to_lsp(&self) -> lsp::DocumentSymbol {
        lsp::DocumentSymbol {
            name: self.name.clone(),
            detail: Some(self.kind.as_str().to_string()),
            kind: self.kind.to_lsp(),
            tags: None,
            deprecated: None,
            range: self.range,
            selection_range: self.range,
            children: match self.children.is_empty() {
                true => None,
                false => Some(self.children.iter().map(|c| c.to_lsp()).collect())
            }
        }
    }
}

fn point(pos: lsp::Position) -> lsp::Range {
    lsp::Range::new(pos,pos)
}

/// Find or create the node for one nesting level, placed at the open code position `at`
fn level<'a>(items: &'a mut Vec<DocumentSymbolItem>,frame: &ProcessingFrame,at: lsp::Position) -> &'a mut Vec<DocumentSymbolItem> {
    let (kind,name) = match frame.proc_type {
        FileProcessingType::Macro => (DocumentSymbolKind::Macro,frame.member_name.as_ref().map_or(String::new(),|n| n.to_string())),
        _ => (DocumentSymbolKind::Copy,match &frame.member_name {
            Some(n) => n.to_string(),
            None => frame.proc_location.file.clone()
        })
    };
    let idx = match items.iter().position(|i| i.kind==kind && i.name==name) {
        Some(i) => i,
        None => {
            items.push(DocumentSymbolItem::new(&name,kind,point(at)));
            items.len() - 1
        }
    };
    &mut items[idx].children
}

/// Walk down the nesting path, creating nodes as needed
fn descend<'a>(items: &'a mut Vec<DocumentSymbolItem>,frames: &[ProcessingFrame],at: lsp::Position) -> &'a mut Vec<DocumentSymbolItem> {
    match frames.split_first() {
        Some((first,rest)) => descend(level(items,first,at),rest,at),
        None => items
    }
}

/// Does the symbol's path start with the section's path
fn nests_under(sect: &Symbol,sym: &Symbol) -> bool {
    sym.proc_stack.len() >= sect.proc_stack.len() &&
        sect.proc_stack.iter().zip(sym.proc_stack.iter()).all(|(a,b)| a.same_member(b))
}

/// Open code position of the statement that produced the symbol
fn call_site(sym: &Symbol) -> lsp::Position {
    match sym.proc_stack.first() {
        Some(f) => f.proc_location.pos,
        None => sym.location.pos
    }
}

/// Sections and equates written in open code start at their label
fn symbol_range(sym: &Symbol) -> lsp::Range {
    match sym.attributes.origin {
        SymbolOrigin::Sect | SymbolOrigin::Equ if sym.proc_stack.len() < 2 => point(sym.location.pos),
        _ => point(call_site(sym))
    }
}

fn opencode_outline(lsp: &LspContext,file: &FileInfo) -> Vec<DocumentSymbolItem> {
    let mut root = Vec::new();
    let opencode = match lsp.opencode() {
        Some(o) => o,
        None => return root
    };
    let ord = &opencode.hlasm_ctx.ord_ctx;
    let in_file = |frames: &[ProcessingFrame]| match frames.first() {
        Some(f) => f.proc_location.file==file.name,
        None => false
    };
    // section symbols, in order of definition
    let mut sections: Vec<(SectionId,&Symbol)> = Vec::new();
    for sym in ord.symbols() {
        if let (SymbolOrigin::Sect,SymbolValue::Reloc(r)) = (sym.attributes.origin,sym.value) {
            if ord.get_section(&sym.name)==Some(r.section) && r.offset==0 {
                sections.push((r.section,sym));
            }
        }
    }
    let mut sect_children: HashMap<SectionId,Vec<DocumentSymbolItem>> = HashMap::new();
    for sym in ord.symbols() {
        if !in_file(&sym.proc_stack) || sections.iter().any(|(_,s)| s.name==sym.name) {
            continue;
        }
        let leaf = DocumentSymbolItem::new(&sym.name,DocumentSymbolKind::from_origin(sym.attributes.origin),symbol_range(sym));
        match sym.value {
            SymbolValue::Abs(_) => descend(&mut root,&sym.proc_stack[1..],call_site(sym)).push(leaf),
            SymbolValue::Reloc(r) => match sections.iter().find(|(id,_)| *id==r.section) {
                Some((_,sect)) if nests_under(sect,sym) => {
                    let children = sect_children.entry(r.section).or_default();
                    descend(children,&sym.proc_stack[sect.proc_stack.len()..],call_site(sym)).push(leaf);
                },
                _ => descend(&mut root,&sym.proc_stack[1..],call_site(sym)).push(leaf)
            },
            SymbolValue::Undef => {}
        }
    }
    for (id,sect) in &sections {
        if !in_file(&sect.proc_stack) {
            continue;
        }
        let kind = match ord.section(*id) {
            Some(s) => DocumentSymbolKind::from_section(s.kind),
            None => DocumentSymbolKind::Unknown
        };
        let children = sect_children.remove(id).unwrap_or_default();
        let item = DocumentSymbolItem::with_children(&sect.name,kind,symbol_range(sect),children);
        descend(&mut root,&sect.proc_stack[1..],call_site(sect)).push(item);
    }
    for var in &opencode.variable_definitions {
        if !in_file(&var.proc_stack) {
            continue;
        }
        let at = var.proc_stack[0].proc_location.pos;
        let leaf = DocumentSymbolItem::new(&var.name,DocumentSymbolKind::Var,point(at));
        descend(&mut root,&var.proc_stack[1..],at).push(leaf);
    }
    root
}

/// Place an entry of a macro file, entries that came from a copy member go under a COPY node
fn add_macro_entry(items: &mut Vec<DocumentSymbolItem>,nests: &CopyNests,file: &str,def_file: &str,def_location: Option<usize>,leaf: DocumentSymbolItem) {
    let nest = match def_location.and_then(|i| nests.get(i)) {
        Some(n) if n.len() > 1 => n,
        _ => {
            if def_file==file {
                items.push(leaf);
            }
            return;
        }
    };
    if nest[0].loc.file != file {
        return;
    }
    let name = match nest.last().and_then(|n| n.member.as_ref()) {
        Some(m) => m.to_string(),
        None => return
    };
    let range = point(nest[0].loc.pos);
    let idx = match items.iter().position(|i| i.kind==DocumentSymbolKind::Copy && i.name==name && i.range==range) {
        Some(i) => i,
        None => {
            items.push(DocumentSymbolItem::new(&name,DocumentSymbolKind::Copy,range));
            items.len() - 1
        }
    };
    items[idx].children.push(DocumentSymbolItem { range, ..leaf });
}

fn macro_outline_one(info: &MacroInfoPtr,file: &str,items: &mut Vec<DocumentSymbolItem>) {
    let def = &info.macro_definition;
    for var in &info.var_definitions {
        let leaf = DocumentSymbolItem::new(&var.name,DocumentSymbolKind::Var,point(var.def_position));
        add_macro_entry(items,&def.copy_nests,file,&var.file,var.def_location,leaf);
    }
    let mut labels: Vec<_> = def.labels.values().collect();
    labels.sort_by_key(|s| s.statement_offset);
    for seq in labels {
        let leaf = DocumentSymbolItem::new(&seq.name,DocumentSymbolKind::Seq,point(seq.location.pos));
        add_macro_entry(items,&def.copy_nests,file,&seq.location.file,Some(seq.statement_offset),leaf);
    }
}

fn macro_outline(lsp: &LspContext,file: &FileInfo) -> Vec<DocumentSymbolItem> {
    let mut ans = Vec::new();
    let mut macros: Vec<&MacroInfoPtr> = lsp.macros().filter(|m| m.definition_location.file==file.name).collect();
    macros.sort_by_key(|m| m.definition_location.pos.line);
    for m in macros {
        macro_outline_one(m,&file.name,&mut ans);
    }
    ans
}

fn copy_outline(file: &FileInfo) -> Vec<DocumentSymbolItem> {
    let mut ans = Vec::new();
    let mut seen: HashSet<(Id,OccurrenceKind)> = HashSet::new();
    for occ in &file.occurrences {
        let kind = match occ.kind {
            OccurrenceKind::Var => DocumentSymbolKind::Var,
            OccurrenceKind::Seq => DocumentSymbolKind::Seq,
            _ => continue
        };
        if seen.insert((occ.name.clone(),occ.kind)) {
            ans.push(DocumentSymbolItem::new(&occ.name,kind,occ.range));
        }
    }
    ans
}

pub fn document_symbol(lsp: &LspContext,uri: &str) -> Vec<DocumentSymbolItem> {
    let file = match lsp.file(uri) {
        Some(f) => f,
        None => return Vec::new()
    };
    match file.file_type {
        FileType::Opencode => opencode_outline(lsp,file),
        FileType::Macro => macro_outline(lsp,file),
        FileType::Copy => copy_outline(file)
    }
}
