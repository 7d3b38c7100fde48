//! # Semantic index
//!
//! Built after analysis from the finished `HlasmContext` and the occurrences the
//! analyzer recorded.  Every query is a pure read: outline, definition, references,
//! hover and completion.
//!
//! Occurrences of variable and sequence symbols are *scoped*: they only mean something
//! within one macro definition or within open code.  Ordinary symbols, instructions and
//! copy operands are global.  A file can be split into slices, each slice belonging
//! to one macro definition, which is how a position finds its scope.

pub mod file_info;
pub mod document_symbols;
pub mod hovers;
pub mod completions;

use std::collections::HashMap;
use std::rc::Rc;
use lsp_types as lsp;
use super::context::HlasmContext;
use super::ids::Id;
use super::macros::MacroDefinition;
use super::processing::ProcessingStack;
use super::settings::Settings;
use super::variables::SetType;
use super::Location;
use file_info::{FileInfo,FileType,FileOwner};
use document_symbols::DocumentSymbolItem;

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub enum OccurrenceKind {
    Ord,
    Seq,
    Var,
    Instr,
    CopyOp
}

#[derive(Clone,Debug)]
pub struct SymbolOccurrence {
    pub kind: OccurrenceKind,
    pub name: Id,
    pub range: lsp::Range,
    /// the macro an instruction occurrence calls
    pub opcode: Option<Rc<MacroDefinition>>
}

impl SymbolOccurrence {
    pub fn new(kind: OccurrenceKind,name: Id,range: lsp::Range) -> Self {
        Self { kind, name, range, opcode: None }
    }
    pub fn new_instr(name: Id,range: lsp::Range,opcode: Option<Rc<MacroDefinition>>) -> Self {
        Self { kind: OccurrenceKind::Instr, name, range, opcode }
    }
    pub fn is_scoped(&self) -> bool {
        matches!(self.kind,OccurrenceKind::Var | OccurrenceKind::Seq)
    }
    /// Same symbol, regardless of where it occurs
    pub fn is_similar(&self,other: &SymbolOccurrence) -> bool {
        self.kind==other.kind && self.name==other.name && match (&self.opcode,&other.opcode) {
            (Some(a),Some(b)) => Rc::ptr_eq(a,b),
            (None,None) => true,
            _ => false
        }
    }
}

pub type FileOccurrences = HashMap<String,Vec<SymbolOccurrence>>;

pub fn add_occurrence(occs: &mut FileOccurrences,file: &str,occ: SymbolOccurrence) {
    occs.entry(file.to_string()).or_default().push(occ);
}

/// Where a variable symbol is declared
#[derive(Clone,Debug)]
pub struct VariableSymbolDefinition {
    pub name: Id,
    pub macro_param: bool,
    pub ty: SetType,
    pub global: bool,
    pub file: String,
    pub def_position: lsp::Position,
    /// statement index within the macro body, `None` for prototype parameters and open code
    pub def_location: Option<usize>,
    /// processing stack at the declaration, kept for open code declarations
    pub proc_stack: ProcessingStack
}

impl VariableSymbolDefinition {
    pub fn new_param(name: Id,file: &str,def_position: lsp::Position) -> Self {
        Self {
            name,
            macro_param: true,
            ty: SetType::C,
            global: false,
            file: file.to_string(),
            def_position,
            def_location: None,
            proc_stack: ProcessingStack::new()
        }
    }
    pub fn new_set(name: Id,ty: SetType,global: bool,file: &str,def_position: lsp::Position,def_location: Option<usize>,proc_stack: ProcessingStack) -> Self {
        Self {
            name,
            macro_param: false,
            ty,
            global,
            file: file.to_string(),
            def_position,
            def_location,
            proc_stack
        }
    }
}

/// Lines `begin_line..end_line` of a file belong to one macro definition
#[derive(Clone,Debug,PartialEq)]
pub struct MacroSlice {
    pub begin_line: u32,
    pub end_line: u32
}

pub struct MacroInfo {
    pub external: bool,
    pub macro_definition: Rc<MacroDefinition>,
    pub definition_location: Location,
    pub file_scopes: HashMap<String,Vec<MacroSlice>>,
    pub file_occurrences: FileOccurrences,
    pub var_definitions: Vec<VariableSymbolDefinition>
}

pub type MacroInfoPtr = Rc<MacroInfo>;

pub struct OpencodeInfo {
    pub hlasm_ctx: HlasmContext,
    pub variable_definitions: Vec<VariableSymbolDefinition>,
    pub file_occurrences: FileOccurrences
}

/// A range in a named file
#[derive(Clone,PartialEq,Debug)]
pub struct FileRange {
    pub file: String,
    pub range: lsp::Range
}

impl FileRange {
    pub fn to_lsp(&self) -> Option<lsp::Location> {
        match lsp::Url::parse(&self.file) {
            Ok(uri) => Some(lsp::Location::new(uri,self.range)),
            Err(_) => None
        }
    }
}

pub struct LspContext {
    files: HashMap<String,FileInfo>,
    /// keyed by the address of the definition
    macros: HashMap<usize,MacroInfoPtr>,
    opencode: Option<OpencodeInfo>,
    settings: Settings
}

fn macro_key(def: &Rc<MacroDefinition>) -> usize {
    Rc::as_ptr(def) as usize
}

impl LspContext {
    pub fn new(settings: &Settings) -> Self {
        Self {
            files: HashMap::new(),
            macros: HashMap::new(),
            opencode: None,
            settings: settings.clone()
        }
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    /// Register a source file, a file that is already known is left alone
    pub fn add_file(&mut self,name: &str,file_type: FileType,owner: FileOwner,text: &str) {
        if self.files.contains_key(name) {
            return;
        }
        log::debug!("index file {} as {:?}",name,file_type);
        self.files.insert(name.to_string(),FileInfo::new(name,file_type,owner,text));
    }
    pub fn add_macro(&mut self,info: MacroInfo) -> MacroInfoPtr {
        let ans = Rc::new(info);
        self.macros.insert(macro_key(&ans.macro_definition),Rc::clone(&ans));
        ans
    }
    /// Install open code and attach every recorded occurrence and slice to its file
    pub fn add_opencode(&mut self,info: OpencodeInfo) {
        let mut macros: Vec<MacroInfoPtr> = self.macros.values().cloned().collect();
        macros.sort_by_key(|m| (m.definition_location.file.clone(),m.definition_location.pos.line));
        for m in &macros {
            for (file,occs) in &m.file_occurrences {
                match self.files.get_mut(file) {
                    Some(f) => f.update_occurrences(occs),
                    None => log::warn!("occurrences for unknown file {}",file)
                }
            }
            for (file,slices) in &m.file_scopes {
                if let Some(f) = self.files.get_mut(file) {
                    f.update_slices(slices,m);
                }
            }
        }
        for (file,occs) in &info.file_occurrences {
            match self.files.get_mut(file) {
                Some(f) => f.update_occurrences(occs),
                None => log::warn!("occurrences for unknown file {}",file)
            }
        }
        self.opencode = Some(info);
    }
    pub fn opencode(&self) -> Option<&OpencodeInfo> {
        self.opencode.as_ref()
    }
    pub fn hlasm_ctx(&self) -> Option<&HlasmContext> {
        self.opencode.as_ref().map(|o| &o.hlasm_ctx)
    }
    pub fn file(&self,name: &str) -> Option<&FileInfo> {
        self.files.get(name)
    }
    pub fn files(&self) -> impl Iterator<Item=&FileInfo> {
        self.files.values()
    }
    pub fn macros(&self) -> impl Iterator<Item=&MacroInfoPtr> {
        self.macros.values()
    }
    pub fn macro_info(&self,def: &Rc<MacroDefinition>) -> Option<MacroInfoPtr> {
        self.macros.get(&macro_key(def)).cloned()
    }

    /// Outline of the file
    pub fn document_symbol(&self,uri: &str) -> Vec<DocumentSymbolItem> {
        document_symbols::document_symbol(self,uri)
    }
    /// Definition of the symbol at `pos`, or `pos` itself if there is nothing there
    pub fn definition(&self,uri: &str,pos: lsp::Position) -> Location {
        let unchanged = Location::new(uri,pos);
        let file = match self.files.get(uri) {
            Some(f) => f,
            None => return unchanged
        };
        let (occ,macro_scope) = file.find_occurrence_with_scope(&pos);
        match occ {
            Some(occ) => self.find_definition_location(occ,macro_scope.as_ref()).unwrap_or(unchanged),
            None => unchanged
        }
    }
    fn find_definition_location(&self,occ: &SymbolOccurrence,macro_scope: Option<&MacroInfoPtr>) -> Option<Location> {
        let opencode = self.opencode.as_ref()?;
        let ctx = &opencode.hlasm_ctx;
        match occ.kind {
            OccurrenceKind::Ord => ctx.ord_ctx.get_symbol(&occ.name).map(|s| s.location.clone()),
            OccurrenceKind::Seq => match macro_scope {
                Some(m) => m.macro_definition.labels.get(&occ.name).map(|s| s.location.clone()),
                None => ctx.current_scope().sequence_symbols.get(&occ.name).map(|s| s.location.clone())
            },
            OccurrenceKind::Var => {
                let defs = match macro_scope {
                    Some(m) => &m.var_definitions,
                    None => &opencode.variable_definitions
                };
                let def = defs.iter().find(|d| d.name==occ.name)?;
                let file = match (macro_scope,def.def_location) {
                    (Some(m),Some(idx)) => match m.macro_definition.copy_nests.get(idx).and_then(|n| n.last()) {
                        Some(item) => item.loc.file.clone(),
                        None => def.file.clone()
                    },
                    _ => def.file.clone()
                };
                Some(Location::new(&file,def.def_position))
            },
            OccurrenceKind::Instr => occ.opcode.as_ref().map(|m| match self.macro_info(m) {
                Some(info) => info.definition_location.clone(),
                None => m.definition_location.clone()
            }),
            OccurrenceKind::CopyOp => self.files.values().find_map(|f| match (&f.file_type,&f.owner) {
                (FileType::Copy,FileOwner::Copy(member)) if member.name==occ.name => Some(member.definition_location.clone()),
                _ => None
            })
        }
    }
    /// Every occurrence of the symbol at `pos`
    pub fn references(&self,uri: &str,pos: lsp::Position) -> Vec<FileRange> {
        let mut ans = Vec::new();
        let file = match self.files.get(uri) {
            Some(f) => f,
            None => return ans
        };
        let opencode = match self.opencode.as_ref() {
            Some(o) => o,
            None => return ans
        };
        let (occ,macro_scope) = file.find_occurrence_with_scope(&pos);
        let occ = match occ {
            Some(o) => o,
            None => return ans
        };
        if occ.is_scoped() {
            match macro_scope {
                Some(m) => collect_references(occ,&m.file_occurrences,&mut ans),
                None => collect_references(occ,&opencode.file_occurrences,&mut ans)
            }
        } else {
            for m in self.macros.values() {
                collect_references(occ,&m.file_occurrences,&mut ans);
            }
            collect_references(occ,&opencode.file_occurrences,&mut ans);
        }
        ans.sort_by(|a,b| (&a.file,a.range.start.line,a.range.start.character).cmp(&(&b.file,b.range.start.line,b.range.start.character)));
        ans.dedup();
        ans
    }
    /// Markdown hover text, empty if there is nothing to say
    pub fn hover(&self,uri: &str,pos: lsp::Position) -> String {
        hovers::hover(self,uri,pos)
    }
    /// `trigger` is the character that triggered completion, if any
    pub fn completion(&self,uri: &str,pos: lsp::Position,trigger: Option<char>) -> Vec<lsp::CompletionItem> {
        completions::completion(self,uri,pos,trigger)
    }

    pub fn document_symbol_lsp(&self,uri: &str) -> Vec<lsp::DocumentSymbol> {
        self.document_symbol(uri).iter().map(|i| i.to_lsp()).collect()
    }
    pub fn hover_lsp(&self,uri: &str,pos: lsp::Position) -> Option<lsp::Hover> {
        let text = self.hover(uri,pos);
        if text.is_empty() {
            return None;
        }
        Some(lsp::Hover {
            contents: lsp::HoverContents::Markup(lsp::MarkupContent {
                kind: lsp::MarkupKind::Markdown,
                value: text
            }),
            range: None
        })
    }
}

fn collect_references(occ: &SymbolOccurrence,occurrences: &FileOccurrences,ans: &mut Vec<FileRange>) {
    for (file,occs) in occurrences {
        for range in FileInfo::find_references(occ,occs) {
            ans.push(FileRange { file: file.to_string(), range });
        }
    }
}
