//! # Analyzer
//!
//! Drives `HlasmContext` through one compilation unit and records what the semantic
//! index needs.  This is deliberately a small assembler: it follows conditional assembly,
//! expands macros, opens copy members and keeps the location counter, but it does not
//! generate object code or diagnose operands.
//!
//! Open code statements are processed in order.  Macro definitions are captured when
//! they are encountered, or loaded from the `Library` on first use.  Copy members are
//! expanded in place, inside a macro definition they become part of its body and their
//! nesting is kept in the definition's copy nests.

pub mod library;
pub mod expressions;
pub mod occurrences;

use std::collections::{HashMap,HashSet};
use std::rc::Rc;
use lsp_types as lsp;
use super::context::HlasmContext;
use super::ids::Id;
use super::macros::{CopyMember,CopyNestItem,MacroArg,MacroDefinition,MacroInvoPtr,MacroParamDef,SequenceSymbol};
use super::ordinary::{RelocValue,SectionKind,SymbolAttributes,SymbolOrigin,SymbolValue};
use super::processing::ProcessingKind;
use super::settings::Settings;
use super::statement::{self,Statement};
use super::variables::{MacroData,SetType};
use super::handbook::InstructionKind;
use super::lsp::{add_occurrence,FileOccurrences,LspContext,MacroInfo,MacroSlice,OccurrenceKind,OpencodeInfo,VariableSymbolDefinition};
use super::lsp::file_info::{FileOwner,FileType};
use super::{ebcdic,terms,Location};
use expressions::{evaluate,split_conditional_branch,split_var_name,to_arith,to_bool};
use library::Library;

#[derive(Clone,Copy,PartialEq,Debug)]
enum Flow {
    Next,
    Jump(usize),
    Exit
}

/// A statement and where it came from, see `CopyNestItem`
#[derive(Clone)]
struct NestedStatement {
    stmt: Statement,
    nest: Vec<CopyNestItem>
}

impl NestedStatement {
    fn direct(stmt: &Statement,file: &str) -> Self {
        Self {
            stmt: stmt.clone(),
            nest: vec![CopyNestItem { loc: Location::new(file,stmt.position()), member: None }]
        }
    }
    fn file(&self) -> &str {
        match self.nest.last() {
            Some(n) => &n.loc.file,
            None => ""
        }
    }
}

/// The list a statement is being processed from
enum Listing<'s> {
    /// open code, or a copy member opened from it
    Opencode { stmts: &'s [Statement], file: &'s str, index: usize },
    Macro { def: &'s Rc<MacroDefinition>, index: usize }
}

impl<'s> Listing<'s> {
    fn file(&self) -> String {
        match self {
            Self::Opencode { file, .. } => file.to_string(),
            Self::Macro { def, index } => match def.copy_nests.get(*index).and_then(|n| n.last()) {
                Some(n) => n.loc.file.clone(),
                None => def.definition_location.file.clone()
            }
        }
    }
}

/// Index of the `MEND` closing the `MACRO` at `begin`, or the last index if there is none
fn find_mend(stmts: &[Statement],begin: usize) -> usize {
    let mut depth = 0;
    for i in begin..stmts.len() {
        match stmts[i].opcode().as_str() {
            "MACRO" => depth += 1,
            "MEND" => {
                depth -= 1;
                if depth==0 {
                    return i;
                }
            },
            _ => {}
        }
    }
    stmts.len().saturating_sub(1)
}

fn ordinary_label(stmt: &Statement) -> Option<String> {
    let lbl = stmt.label_text();
    if lbl.is_empty() || lbl.starts_with('.') || lbl.contains('&') {
        return None;
    }
    Some(lbl.to_uppercase())
}

fn set_type_of(opcode: &str) -> SetType {
    match opcode.chars().last() {
        Some('A') => SetType::A,
        Some('B') => SetType::B,
        _ => SetType::C
    }
}

/// Parsed DC/DS operand
struct DataOperand {
    dup: i32,
    ty: char,
    length: i32,
    explicit_length: bool,
    alignment: i32,
    count: i32
}

fn parse_data_operand(text: &str) -> Option<DataOperand> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut digits = String::new();
    while i < chars.len() && chars[i].is_ascii_digit() {
        digits.push(chars[i]);
        i += 1;
    }
    let dup = if digits.is_empty() { 1 } else { digits.parse::<i32>().unwrap_or(1) };
    let ty = chars.get(i)?.to_ascii_uppercase();
    if !ty.is_ascii_alphabetic() {
        return None;
    }
    i += 1;
    let doubled = chars.get(i).map(|c| c.to_ascii_uppercase())==Some('D') && "AFV".contains(ty);
    if doubled {
        i += 1;
    }
    let mut explicit = None;
    if chars.get(i).map(|c| c.to_ascii_uppercase())==Some('L') {
        i += 1;
        let mut len = String::new();
        while i < chars.len() && chars[i].is_ascii_digit() {
            len.push(chars[i]);
            i += 1;
        }
        explicit = len.parse::<i32>().ok();
    }
    while i < chars.len() && chars[i] != '\'' && chars[i] != '(' {
        i += 1;
    }
    let nominal: Option<String> = match chars.get(i) {
        Some('\'') => {
            let mut s = String::new();
            let mut j = i + 1;
            while j < chars.len() {
                if chars[j]=='\'' {
                    if chars.get(j+1)==Some(&'\'') {
                        s.push('\'');
                        j += 2;
                        continue;
                    }
                    break;
                }
                s.push(chars[j]);
                j += 1;
            }
            Some(s)
        },
        Some('(') => Some(chars[i+1..chars.len().saturating_sub(1)].iter().collect()),
        _ => None
    };
    let (implicit,alignment) = match (ty,doubled) {
        ('A',true) | ('F',true) | ('V',true) | ('D',_) => (8,8),
        ('F',_) | ('A',_) | ('V',_) | ('E',_) | ('Q',_) | ('J',_) | ('R',_) => (4,4),
        ('H',_) | ('Y',_) | ('S',_) => (2,2),
        ('L',_) => (16,8),
        ('C',_) => (nominal.as_ref().map_or(1,|n| n.chars().count().max(1) as i32),1),
        ('X',_) => (nominal.as_ref().map_or(1,|n| ((n.len()+1)/2).max(1) as i32),1),
        ('B',_) => (nominal.as_ref().map_or(1,|n| ((n.len()+7)/8).max(1) as i32),1),
        ('P',_) => (nominal.as_ref().map_or(1,|n| (n.trim_start_matches(&['+','-'][..]).len()/2+1) as i32),1),
        ('Z',_) => (nominal.as_ref().map_or(1,|n| n.trim_start_matches(&['+','-'][..]).len().max(1) as i32),1),
        _ => (1,1)
    };
    let count = match (ty,&nominal) {
        ('C',_) | ('X',_) | ('B',_) | (_,None) => 1,
        (_,Some(n)) => statement::split_operands(n).len().max(1) as i32
    };
    Some(DataOperand {
        dup,
        ty,
        length: explicit.unwrap_or(implicit),
        explicit_length: explicit.is_some(),
        alignment: if explicit.is_some() { 1 } else { alignment },
        count
    })
}

/// Split `A+B-C` into signed terms at the top level
fn split_terms(text: &str) -> Vec<(i32,String)> {
    let mut ans = Vec::new();
    let mut sign = 1;
    let mut curr = String::new();
    let mut depth = 0;
    let mut quoted = false;
    let chars: Vec<char> = text.chars().collect();
    for (i,c) in chars.iter().enumerate() {
        match c {
            '\'' if !statement::is_attribute_quote(&chars,i) => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth -= 1,
            '+' | '-' if !quoted && depth==0 && !curr.is_empty() => {
                ans.push((sign,curr));
                curr = String::new();
                sign = if *c=='-' { -1 } else { 1 };
                continue;
            },
            _ => {}
        }
        curr.push(*c);
    }
    ans.push((sign,curr));
    ans
}

fn parse_arg(ids: &mut super::ids::IdStorage,text: &str) -> MacroArg {
    if let Some(eq) = text.find('=') {
        let key = &text[0..eq];
        if key.chars().next().map_or(false,expressions::is_name_start) && key.chars().all(expressions::is_name_char) {
            return MacroArg {
                keyword: Some(ids.add(&key.to_uppercase())),
                data: MacroData::from_operand(&text[eq+1..])
            };
        }
    }
    MacroArg { keyword: None, data: MacroData::from_operand(text) }
}

pub struct Analyzer<'a> {
    ctx: HlasmContext,
    library: &'a dyn Library,
    settings: Settings,
    index: LspContext,
    macro_infos: Vec<MacroInfo>,
    /// macro definitions already indexed, by file and line
    indexed_definitions: HashSet<(String,u32)>,
    opencode_occurrences: FileOccurrences,
    opencode_vars: Vec<VariableSymbolDefinition>,
    missing_macros: HashSet<String>,
    missing_copies: HashSet<String>
}

impl<'a> Analyzer<'a> {
    pub fn new(uri: &str,text: &str,library: &'a dyn Library,settings: &Settings) -> Self {
        Self::with_context(HlasmContext::new(uri,settings),text,library,settings)
    }
    /// Analyze with a context that was prepared by the caller
    pub fn with_context(ctx: HlasmContext,text: &str,library: &'a dyn Library,settings: &Settings) -> Self {
        let mut index = LspContext::new(settings);
        index.add_file(ctx.opencode_file_name(),FileType::Opencode,FileOwner::Opencode,text);
        Self {
            ctx,
            library,
            settings: settings.clone(),
            index,
            macro_infos: Vec::new(),
            indexed_definitions: HashSet::new(),
            opencode_occurrences: FileOccurrences::new(),
            opencode_vars: Vec::new(),
            missing_macros: HashSet::new(),
            missing_copies: HashSet::new()
        }
    }
    /// Process the open code and hand back the finished index
    pub fn run(mut self,text: &str) -> LspContext {
        let file = self.ctx.opencode_file_name().to_string();
        log::debug!("analyzing {}",file);
        let stmts = statement::parse_source(text);
        self.process_opencode(&stmts,&file);
        self.resolve_instruction_occurrences();
        for info in std::mem::take(&mut self.macro_infos) {
            self.index.add_macro(info);
        }
        self.index.add_opencode(OpencodeInfo {
            hlasm_ctx: self.ctx,
            variable_definitions: self.opencode_vars,
            file_occurrences: self.opencode_occurrences
        });
        self.index
    }

    /// Calls of macros that were defined after the call was seen are resolved
    /// against the final macro table
    fn resolve_instruction_occurrences(&mut self) {
        let ctx = &self.ctx;
        let resolve = |occs: &mut FileOccurrences| {
            for occ in occs.values_mut().flatten() {
                if occ.kind==OccurrenceKind::Instr && occ.opcode.is_none() {
                    let op = ctx.get_mnemonic_opcode(&occ.name);
                    occ.opcode = ctx.get_macro_definition(&op);
                }
            }
        };
        resolve(&mut self.opencode_occurrences);
        for info in self.macro_infos.iter_mut() {
            resolve(&mut info.file_occurrences);
        }
    }

    // statement lists

    fn track_position(&mut self,stmt: &Statement,index: usize) {
        if let Some(cursor) = self.ctx.current_copy_stack_mut().last_mut() {
            cursor.current_statement = index;
            return;
        }
        self.ctx.set_source_position(stmt.position());
        self.ctx.set_source_indices(index,index+1,stmt.range.end.line as usize);
    }
    fn process_opencode(&mut self,stmts: &[Statement],file: &str) -> Flow {
        let mut i = 0;
        while i < stmts.len() {
            let stmt = &stmts[i];
            self.track_position(stmt,i);
            if stmt.opcode()=="MACRO" {
                let end = find_mend(stmts,i);
                let items: Vec<NestedStatement> = stmts[i..=end].iter().map(|s| NestedStatement::direct(s,file)).collect();
                self.ctx.push_statement_processing(ProcessingKind::MacroDefinition);
                self.define_macro(items,false);
                if let Err(e) = self.ctx.pop_statement_processing() {
                    log::error!("{}",e);
                }
                i = end + 1;
                continue;
            }
            match self.process_statement(stmt,&Listing::Opencode { stmts, file, index: i }) {
                Flow::Next => i += 1,
                Flow::Jump(j) => i = j,
                Flow::Exit => return Flow::Exit
            }
        }
        Flow::Next
    }
    fn expand(&mut self,def: &Rc<MacroDefinition>,invo: &MacroInvoPtr) {
        let mut i = 0;
        while i < def.body.len() {
            invo.borrow_mut().current_statement = i;
            let stmt = &def.body[i];
            match stmt.opcode().as_str() {
                "MACRO" => {
                    let end = find_mend(&def.body,i);
                    let items: Vec<NestedStatement> = (i..=end).map(|k| NestedStatement {
                        stmt: def.body[k].clone(),
                        nest: def.copy_nests.get(k).cloned().unwrap_or_default()
                    }).collect();
                    self.define_macro(items,false);
                    i = end + 1;
                    continue;
                },
                "MEND" => break,
                _ => {}
            }
            match self.process_statement(stmt,&Listing::Macro { def, index: i }) {
                Flow::Next => i += 1,
                Flow::Jump(j) => i = j,
                Flow::Exit => break
            }
        }
    }

    // one statement

    fn process_statement(&mut self,raw: &Statement,listing: &Listing) -> Flow {
        let file = listing.file();
        let raw_opcode = raw.opcode();
        if let Listing::Opencode { index, .. } = listing {
            self.register_sequence_symbol(raw,&file,*index);
            let called = self.find_macro(&raw_opcode);
            for occ in occurrences::collect(self.ctx.ids_mut(),raw,called) {
                add_occurrence(&mut self.opencode_occurrences,&file,occ);
            }
        }
        let raw_id = self.ctx.add_id(&raw_opcode);
        let resolved = self.ctx.get_mnemonic_opcode(&raw_id);
        if let Some(flow) = self.conditional_assembly(raw,resolved.as_str(),listing) {
            return flow;
        }
        let stmt = self.substitute_statement(raw);
        let opcode = stmt.opcode();
        if opcode.is_empty() {
            return Flow::Next;
        }
        let id = self.ctx.add_id(&opcode);
        let resolved = self.ctx.get_mnemonic_opcode(&id);
        if resolved.is_empty() {
            log::warn!("operation code {} is not available",opcode);
            return Flow::Next;
        }
        match resolved.as_str() {
            "COPY" => return match listing {
                Listing::Opencode { .. } => self.copy(&stmt),
                Listing::Macro { .. } => Flow::Next
            },
            "END" => return match listing {
                Listing::Opencode { .. } => Flow::Exit,
                Listing::Macro { .. } => Flow::Next
            },
            _ => {}
        }
        if let Some(def) = self.find_macro(resolved.as_str()) {
            self.call_macro(def,&stmt);
            return Flow::Next;
        }
        self.ordinary(&stmt,&resolved,&file);
        Flow::Next
    }
    fn register_sequence_symbol(&mut self,stmt: &Statement,file: &str,index: usize) {
        if let Some(label) = &stmt.label {
            if let Some(name) = label.text.strip_prefix('.') {
                let name = self.ctx.add_id(&name.to_uppercase());
                let seq = SequenceSymbol { name, location: Location::new(file,label.range.start), statement_offset: index };
                if let Err(e) = self.ctx.add_sequence_symbol(seq) {
                    log::debug!("{}",e);
                }
            }
        }
    }
    fn substitute_statement(&self,raw: &Statement) -> Statement {
        let instr = match &raw.instruction {
            Some(f) => f.text.as_str(),
            None => ""
        };
        if !raw.label_text().contains('&') && !instr.contains('&') && !raw.operand_text().contains('&') {
            return raw.clone();
        }
        let label = expressions::substitute(&self.ctx,raw.label_text());
        let instr = expressions::substitute(&self.ctx,instr);
        let operands = expressions::substitute(&self.ctx,raw.operand_text());
        Statement::with_fields(raw,&label,&instr,&operands)
    }

    // conditional assembly

    fn conditional_assembly(&mut self,raw: &Statement,opcode: &str,listing: &Listing) -> Option<Flow> {
        let flow = match opcode {
            "LCLA" | "LCLB" | "LCLC" | "GBLA" | "GBLB" | "GBLC" => {
                self.declare(raw,opcode,listing);
                Flow::Next
            },
            "SETA" | "SETB" | "SETC" => {
                self.assign(raw,opcode,listing);
                Flow::Next
            },
            "AGO" => self.ago(raw,listing),
            "AIF" => self.aif(raw,listing),
            "ACTR" => {
                let value = to_arith(&evaluate(&self.ctx,raw.operand_text()));
                self.ctx.set_branch_counter(value);
                Flow::Next
            },
            "MEXIT" => match listing {
                Listing::Macro { .. } => Flow::Exit,
                Listing::Opencode { .. } => {
                    log::warn!("MEXIT outside of a macro");
                    Flow::Next
                }
            },
            "MEND" => Flow::Exit,
            "ANOP" | "MNOTE" | "AEJECT" | "ASPACE" | "AREAD" | "ACTRL" => Flow::Next,
            _ => return None
        };
        Some(flow)
    }
    fn record_var_definition(&mut self,name: &Id,ty: SetType,global: bool,pos: lsp::Position,listing: &Listing) {
        if let Listing::Opencode { file, .. } = listing {
            if self.opencode_vars.iter().any(|d| &d.name==name) {
                return;
            }
            let stack = self.ctx.processing_stack();
            self.opencode_vars.push(VariableSymbolDefinition::new_set(name.clone(),ty,global,file,pos,None,stack));
        }
    }
    fn declare(&mut self,raw: &Statement,opcode: &str,listing: &Listing) {
        let global = opcode.starts_with("GBL");
        let ty = set_type_of(opcode);
        for op in &raw.operands {
            let (name,sub) = match split_var_name(&op.text) {
                Some(v) => v,
                None => {
                    log::warn!("bad variable declaration {}",op.text);
                    continue;
                }
            };
            let id = self.ctx.add_id(&name);
            match global {
                true => self.ctx.create_global_variable(id.clone(),ty,sub.is_none()),
                false => self.ctx.create_local_variable(id.clone(),ty,sub.is_none())
            };
            self.record_var_definition(&id,ty,global,op.range.start,listing);
        }
    }
    fn assign(&mut self,raw: &Statement,opcode: &str,listing: &Listing) {
        let ty = set_type_of(opcode);
        let (name,sub) = match split_var_name(raw.label_text()) {
            Some(v) => v,
            None => {
                log::warn!("{} without a variable",opcode);
                return;
            }
        };
        let id = self.ctx.add_id(&name);
        let var = match self.ctx.get_var_sym(&id) {
            Some(v) => v,
            None => {
                let v = self.ctx.create_local_variable(id.clone(),ty,sub.is_none());
                if let Some(label) = &raw.label {
                    self.record_var_definition(&id,ty,false,label.range.start,listing);
                }
                v
            }
        };
        let base = sub.map(|s| to_arith(&evaluate(&self.ctx,&s)).max(1) as usize);
        for (k,op) in raw.operands.iter().enumerate() {
            let value = evaluate(&self.ctx,&op.text).coerce(ty);
            let ok = var.borrow_mut().set(base.map(|b| b+k),value);
            if !ok {
                log::warn!("cannot assign to {}",name);
                return;
            }
        }
    }
    fn branch(&mut self,target: &str,listing: &Listing) -> Flow {
        let id = self.ctx.add_id(&target.to_uppercase());
        let offset = match listing {
            Listing::Macro { def, .. } => def.labels.get(&id).map(|s| s.statement_offset),
            Listing::Opencode { stmts, file, index } => {
                let known = match self.ctx.get_sequence_symbol(&id) {
                    Some(seq) if seq.location.file==*file => Some(seq.statement_offset),
                    _ => None
                };
                match known {
                    Some(o) => Some(o),
                    None => self.lookahead(stmts,file,*index,&id)
                }
            }
        };
        match offset {
            Some(o) => {
                self.ctx.decrement_branch_counter();
                if self.ctx.get_branch_counter() < 0 {
                    log::warn!("ACTR limit reached");
                    return Flow::Exit;
                }
                Flow::Jump(o)
            },
            None => {
                log::warn!("sequence symbol {} not found",target);
                Flow::Next
            }
        }
    }
    /// Scan forward for a sequence symbol, registering the ones passed along the way
    fn lookahead(&mut self,stmts: &[Statement],file: &str,index: usize,target: &Id) -> Option<usize> {
        self.ctx.push_statement_processing(ProcessingKind::Lookahead);
        let mut ans = None;
        let mut depth = 0;
        for j in index+1..stmts.len() {
            match stmts[j].opcode().as_str() {
                "MACRO" => depth += 1,
                "MEND" => depth -= 1,
                _ => {}
            }
            if depth > 0 {
                continue;
            }
            self.register_sequence_symbol(&stmts[j],file,j);
            if let Some(name) = stmts[j].label_text().strip_prefix('.') {
                if name.eq_ignore_ascii_case(target) {
                    ans = Some(j);
                    break;
                }
            }
        }
        if let Err(e) = self.ctx.pop_statement_processing() {
            log::error!("{}",e);
        }
        ans
    }
    fn ago(&mut self,raw: &Statement,listing: &Listing) -> Flow {
        let first = match raw.operands.first() {
            Some(op) => op.text.clone(),
            None => return Flow::Next
        };
        if let Some(target) = first.strip_prefix('.') {
            return self.branch(target,listing);
        }
        // computed AGO (&I).A,.B,.C
        let (cond,target) = match split_conditional_branch(&first) {
            Some(v) => v,
            None => return Flow::Next
        };
        let mut targets = vec![target];
        for op in &raw.operands[1..] {
            targets.push(op.text.trim_start_matches('.').to_string());
        }
        let k = to_arith(&evaluate(&self.ctx,&cond));
        match k.checked_sub(1).and_then(|i| targets.get(i as usize)) {
            Some(t) => {
                let t = t.clone();
                self.branch(&t,listing)
            },
            None => Flow::Next
        }
    }
    fn aif(&mut self,raw: &Statement,listing: &Listing) -> Flow {
        for op in &raw.operands {
            let (cond,target) = match split_conditional_branch(&op.text) {
                Some(v) => v,
                None => {
                    log::warn!("bad AIF operand {}",op.text);
                    return Flow::Next;
                }
            };
            if to_bool(&evaluate(&self.ctx,&cond)) {
                return self.branch(&target,listing);
            }
        }
        Flow::Next
    }

    // macros

    /// Macro that an operation code calls, loading it from the library if needed
    fn find_macro(&mut self,opcode: &str) -> Option<Rc<MacroDefinition>> {
        if opcode.is_empty() || opcode.contains('&') {
            return None;
        }
        let id = self.ctx.add_id(opcode);
        let resolved = self.ctx.get_mnemonic_opcode(&id);
        if resolved.is_empty() {
            return None;
        }
        if let Some(def) = self.ctx.get_macro_definition(&resolved) {
            return Some(def);
        }
        if self.ctx.instruction_kind(&resolved).is_some() {
            return None;
        }
        self.load_library_macro(resolved.as_str())
    }
    fn load_library_macro(&mut self,name: &str) -> Option<Rc<MacroDefinition>> {
        if self.missing_macros.contains(name) {
            return None;
        }
        let member = match self.library.get(name) {
            Some(m) => m,
            None => {
                log::debug!("macro {} not in library",name);
                self.missing_macros.insert(name.to_string());
                return None;
            }
        };
        // keep a library member that calls itself from being loaded again
        self.missing_macros.insert(name.to_string());
        let stmts = statement::parse_source(&member.text);
        let begin = match stmts.iter().position(|s| s.opcode()=="MACRO") {
            Some(b) => b,
            None => {
                log::warn!("library member {} has no macro definition",name);
                return None;
            }
        };
        let end = find_mend(&stmts,begin);
        let items: Vec<NestedStatement> = stmts[begin..=end].iter().map(|s| NestedStatement::direct(s,&member.uri)).collect();
        self.ctx.push_statement_processing_with_source(ProcessingKind::MacroDefinition,&member.uri);
        let def = self.define_macro(items,true);
        if let Err(e) = self.ctx.pop_statement_processing() {
            log::error!("{}",e);
        }
        let def = def?;
        if def.id.as_str() != name {
            log::warn!("library member {} defines macro {}",name,def.id);
            return None;
        }
        self.missing_macros.remove(name);
        self.index.add_file(&member.uri,FileType::Macro,FileOwner::Macro(Rc::clone(&def)),&member.text);
        Some(def)
    }
    /// Capture a definition from `MACRO` through `MEND`, register it, and index it
    fn define_macro(&mut self,items: Vec<NestedStatement>,external: bool) -> Option<Rc<MacroDefinition>> {
        if items.len() < 2 {
            log::warn!("macro definition without a prototype");
            return None;
        }
        let def_file = items[0].file().to_string();
        let proto = items[1].stmt.clone();
        let name = proto.opcode();
        if name.is_empty() || name.contains('&') {
            log::warn!("bad macro prototype at line {}",proto.range.start.line+1);
            return None;
        }
        let mut file_occurrences = FileOccurrences::new();
        let mut var_definitions: Vec<VariableSymbolDefinition> = Vec::new();
        let mut add_def = |d: VariableSymbolDefinition| {
            if !var_definitions.iter().any(|v| v.name==d.name) {
                var_definitions.push(d);
            }
        };
        // prototype
        let id = self.ctx.add_id(&name);
        let label_param = match proto.label_text().strip_prefix('&') {
            Some(l) => {
                let lbl = self.ctx.add_id(&l.to_uppercase());
                if let Some(f) = &proto.label {
                    add_def(VariableSymbolDefinition::new_param(lbl.clone(),&def_file,f.range.start));
                }
                Some(lbl)
            },
            None => None
        };
        let mut params = Vec::new();
        for op in &proto.operands {
            let text = match op.text.strip_prefix('&') {
                Some(t) => t,
                None => continue
            };
            let (pname,default) = match text.find('=') {
                Some(eq) => (&text[0..eq],Some(MacroData::from_operand(&text[eq+1..]))),
                None => (text,None)
            };
            let pid = self.ctx.add_id(&pname.to_uppercase());
            add_def(VariableSymbolDefinition::new_param(pid.clone(),&def_file,op.range.start));
            params.push(MacroParamDef { id: pid, default });
        }
        for item in &items[0..2] {
            let occs = occurrences::collect(self.ctx.ids_mut(),&item.stmt,None);
            file_occurrences.entry(item.file().to_string()).or_default().extend(occs);
        }
        // body, with copy members expanded
        let mut body: Vec<NestedStatement> = Vec::new();
        let mut guard: Vec<Id> = Vec::new();
        self.append_body(&items[2..],&mut body,&mut file_occurrences,&mut guard);
        let mut labels = HashMap::new();
        let mut depth = 0;
        for (k,item) in body.iter().enumerate() {
            let opcode = item.stmt.opcode();
            match opcode.as_str() {
                "MACRO" => depth += 1,
                "MEND" => depth -= 1,
                _ => {}
            }
            if depth > 0 {
                continue;
            }
            if let Some(label) = &item.stmt.label {
                if let Some(seq) = label.text.strip_prefix('.') {
                    let sid = self.ctx.add_id(&seq.to_uppercase());
                    labels.entry(sid.clone()).or_insert_with(|| Rc::new(SequenceSymbol {
                        name: sid,
                        location: Location::new(item.file(),label.range.start),
                        statement_offset: k
                    }));
                }
            }
            match opcode.as_str() {
                "LCLA" | "LCLB" | "LCLC" | "GBLA" | "GBLB" | "GBLC" => {
                    for op in &item.stmt.operands {
                        if let Some((vname,_)) = split_var_name(&op.text) {
                            let vid = self.ctx.add_id(&vname);
                            add_def(VariableSymbolDefinition::new_set(vid,set_type_of(&opcode),opcode.starts_with("GBL"),item.file(),op.range.start,Some(k),Vec::new()));
                        }
                    }
                },
                "SETA" | "SETB" | "SETC" => {
                    if let (Some((vname,_)),Some(label)) = (split_var_name(item.stmt.label_text()),&item.stmt.label) {
                        let vid = self.ctx.add_id(&vname);
                        add_def(VariableSymbolDefinition::new_set(vid,set_type_of(&opcode),false,item.file(),label.range.start,Some(k),Vec::new()));
                    }
                },
                _ => {}
            }
        }
        // slices: the definition itself, and the lines each copy member contributed
        let mut file_scopes: HashMap<String,Vec<MacroSlice>> = HashMap::new();
        let first_line = items[0].stmt.range.start.line;
        let last_line = match items.last() {
            Some(i) => i.stmt.range.end.line,
            None => first_line
        };
        file_scopes.entry(def_file.clone()).or_default().push(MacroSlice { begin_line: first_line, end_line: last_line + 1 });
        let mut copy_bounds: HashMap<String,(u32,u32)> = HashMap::new();
        for item in &body {
            if item.nest.len() > 1 {
                let b = copy_bounds.entry(item.file().to_string()).or_insert((u32::MAX,0));
                b.0 = b.0.min(item.stmt.range.start.line);
                b.1 = b.1.max(item.stmt.range.end.line + 1);
            }
        }
        for (file,(b,e)) in copy_bounds {
            file_scopes.entry(file).or_default().push(MacroSlice { begin_line: b, end_line: e });
        }
        let definition_location = Location::new(&def_file,proto.position());
        let (body,copy_nests): (Vec<Statement>,Vec<Vec<CopyNestItem>>) = body.into_iter().map(|n| (n.stmt,n.nest)).unzip();
        let def = self.ctx.add_macro(MacroDefinition {
            id,
            label_param,
            params,
            body,
            copy_nests,
            labels,
            definition_location: definition_location.clone()
        });
        let key = (definition_location.file.clone(),definition_location.pos.line);
        if self.indexed_definitions.insert(key) {
            self.macro_infos.push(MacroInfo {
                external,
                macro_definition: Rc::clone(&def),
                definition_location,
                file_scopes,
                file_occurrences,
                var_definitions
            });
        }
        Some(def)
    }
    /// Append statements to a macro body, replacing COPY statements by the member's statements
    fn append_body(&mut self,items: &[NestedStatement],body: &mut Vec<NestedStatement>,occs: &mut FileOccurrences,guard: &mut Vec<Id>) {
        for item in items {
            let opcode = item.stmt.opcode();
            // only macros defined so far, the library is not searched while defining
            let op_id = self.ctx.add_id(&opcode);
            let called = self.ctx.get_macro_definition(&self.ctx.get_mnemonic_opcode(&op_id));
            let found = occurrences::collect(self.ctx.ids_mut(),&item.stmt,called);
            occs.entry(item.file().to_string()).or_default().extend(found);
            if opcode=="COPY" {
                let name = match item.stmt.operands.first() {
                    Some(op) if !op.text.contains('&') => op.text.to_uppercase(),
                    _ => continue
                };
                let member = match self.get_or_load_copy_member(&name) {
                    Some(m) => m,
                    None => {
                        log::warn!("copy member {} not found",name);
                        continue;
                    }
                };
                if guard.contains(&member.name) {
                    log::warn!("copy member {} includes itself",name);
                    continue;
                }
                let sub: Vec<NestedStatement> = member.body.iter().map(|s| {
                    let mut nest = item.nest.clone();
                    nest.push(CopyNestItem {
                        loc: Location::new(&member.definition_location.file,s.position()),
                        member: Some(member.name.clone())
                    });
                    NestedStatement { stmt: s.clone(), nest }
                }).collect();
                guard.push(member.name.clone());
                self.append_body(&sub,body,occs,guard);
                guard.pop();
                continue;
            }
            body.push(item.clone());
        }
    }
    fn call_macro(&mut self,def: Rc<MacroDefinition>,stmt: &Statement) {
        if self.ctx.scope_stack().len() > self.settings.max_nesting as usize {
            log::warn!("macro nesting limit reached at {}",def.id);
            return;
        }
        let label = match &stmt.label {
            Some(l) if !l.text.starts_with('.') => Some(MacroData::Single(l.text.clone())),
            _ => None
        };
        let args: Vec<MacroArg> = stmt.operands.iter().map(|op| parse_arg(self.ctx.ids_mut(),&op.text)).collect();
        let invo = match self.ctx.enter_macro(&def.id,label,args) {
            Ok(i) => i,
            Err(e) => {
                log::error!("{}",e);
                return;
            }
        };
        let def = Rc::clone(&invo.borrow().definition);
        self.expand(&def,&invo);
        if let Err(e) = self.ctx.leave_macro() {
            log::error!("{}",e);
        }
    }

    // copy members

    fn get_or_load_copy_member(&mut self,name: &str) -> Option<Rc<CopyMember>> {
        let id = self.ctx.add_id(name);
        if let Some(m) = self.ctx.get_copy_member(&id) {
            return Some(m);
        }
        if self.missing_copies.contains(name) {
            return None;
        }
        let found = match self.library.get(name) {
            Some(m) => m,
            None => {
                self.missing_copies.insert(name.to_string());
                return None;
            }
        };
        let body = statement::parse_source(&found.text);
        let member = self.ctx.add_copy_member(id,body,Location::new(&found.uri,lsp::Position::new(0,0)));
        self.index.add_file(&found.uri,FileType::Copy,FileOwner::Copy(Rc::clone(&member)),&found.text);
        Some(member)
    }
    fn copy(&mut self,stmt: &Statement) -> Flow {
        let name = match stmt.operands.first() {
            Some(op) if !op.text.is_empty() => op.text.to_uppercase(),
            _ => {
                log::warn!("COPY without a member name");
                return Flow::Next;
            }
        };
        let member = match self.get_or_load_copy_member(&name) {
            Some(m) => m,
            None => {
                log::warn!("copy member {} not found",name);
                return Flow::Next;
            }
        };
        if self.ctx.whole_copy_stack().contains(&member.name) {
            log::warn!("copy member {} includes itself",name);
            return Flow::Next;
        }
        if let Err(e) = self.ctx.enter_copy_member(&member.name) {
            log::error!("{}",e);
            return Flow::Next;
        }
        let flow = self.process_opencode(&member.body,&member.definition_location.file);
        if let Err(e) = self.ctx.leave_copy_member() {
            log::error!("{}",e);
        }
        match flow {
            Flow::Exit => Flow::Exit,
            _ => Flow::Next
        }
    }

    // ordinary assembly

    fn label_location(stmt: &Statement,file: &str) -> Location {
        match &stmt.label {
            Some(l) => Location::new(file,l.range.start),
            None => Location::new(file,stmt.position())
        }
    }
    fn ordinary(&mut self,stmt: &Statement,opcode: &Id,file: &str) {
        match opcode.as_str() {
            "CSECT" | "START" => self.section(stmt,SectionKind::Executable,file),
            "DSECT" => self.section(stmt,SectionKind::Dummy,file),
            "RSECT" => self.section(stmt,SectionKind::Readonly,file),
            "COM" => self.section(stmt,SectionKind::Common,file),
            "LOCTR" => match ordinary_label(stmt) {
                Some(name) => {
                    let id = self.ctx.add_id(&name);
                    let stack = self.ctx.processing_stack();
                    self.ctx.ord_ctx.set_location_counter(id,Self::label_location(stmt,file),stack);
                },
                None => log::warn!("LOCTR without a name")
            },
            "EQU" => self.equ(stmt,file),
            "DC" | "DS" => self.data(stmt,file),
            "OPSYN" => self.opsyn(stmt),
            _ => match self.ctx.instruction_kind(opcode) {
                Some(InstructionKind::Machine) | Some(InstructionKind::Mnemonic) => self.machine(stmt,opcode,file),
                Some(_) => {},
                None => log::warn!("unknown operation code {}",opcode)
            }
        }
    }
    fn define_label(&mut self,stmt: &Statement,file: &str,value: SymbolValue,attributes: SymbolAttributes) {
        if let Some(name) = ordinary_label(stmt) {
            let id = self.ctx.add_id(&name);
            let stack = self.ctx.processing_stack();
            if !self.ctx.ord_ctx.create_symbol(id,value,attributes,Self::label_location(stmt,file),stack) {
                log::debug!("symbol {} is already defined",name);
            }
        }
    }
    fn section(&mut self,stmt: &Statement,kind: SectionKind,file: &str) {
        let name = ordinary_label(stmt).unwrap_or_default();
        let id = self.ctx.add_id(&name);
        let stack = self.ctx.processing_stack();
        self.ctx.ord_ctx.set_section(id,kind,Self::label_location(stmt,file),stack);
    }
    fn machine(&mut self,stmt: &Statement,opcode: &Id,file: &str) {
        let length = match self.ctx.handbook().get(opcode) {
            Some(ins) if ins.length > 0 => ins.length as i32,
            _ => 4
        };
        let reloc = self.ctx.ord_ctx.align(2);
        let attr = SymbolAttributes::new(SymbolOrigin::Mach,'I').with_length(length as u32);
        self.define_label(stmt,file,SymbolValue::Reloc(reloc),attr);
        self.ctx.ord_ctx.reserve(length);
    }
    fn data(&mut self,stmt: &Statement,file: &str) {
        let mut first = true;
        for op in &stmt.operands {
            let d = match parse_data_operand(&op.text) {
                Some(d) => d,
                None => {
                    log::warn!("bad data operand {}",op.text);
                    continue;
                }
            };
            let reloc = self.ctx.ord_ctx.align(d.alignment);
            if first {
                let attr = SymbolAttributes::new(SymbolOrigin::Dat,d.ty).with_length(d.length as u32);
                self.define_label(stmt,file,SymbolValue::Reloc(reloc),attr);
                first = false;
            }
            log::trace!("{} x {} x {} bytes, explicit length {}",d.dup,d.count,d.length,d.explicit_length);
            self.ctx.ord_ctx.reserve(d.dup * d.count * d.length);
        }
    }
    /// Value of an absolute or simply relocatable expression
    fn expression_value(&mut self,text: &str) -> SymbolValue {
        let mut abs: i32 = 0;
        let mut reloc: Option<RelocValue> = None;
        for (sign,term) in split_terms(text) {
            let value = if term=="*" {
                SymbolValue::Reloc(self.ctx.ord_ctx.current_reloc())
            } else if let Some(v) = terms::self_defining_term(&term) {
                SymbolValue::Abs(v)
            } else {
                match self.ctx.ids().find(&term.to_uppercase()).and_then(|id| self.ctx.ord_ctx.get_symbol(&id).map(|s| s.value)) {
                    Some(v) => v,
                    None => return SymbolValue::Undef
                }
            };
            match (value,sign,reloc) {
                (SymbolValue::Abs(v),_,_) => abs = abs.wrapping_add(sign*v),
                (SymbolValue::Reloc(r),1,None) => reloc = Some(r),
                (SymbolValue::Reloc(r),-1,Some(base)) if base.section==r.section => {
                    abs = abs.wrapping_add(base.offset - r.offset);
                    reloc = None;
                },
                _ => return SymbolValue::Undef
            }
        }
        match reloc {
            Some(r) => SymbolValue::Reloc(RelocValue { section: r.section, offset: r.offset + abs }),
            None => SymbolValue::Abs(abs)
        }
    }
    fn equ(&mut self,stmt: &Statement,file: &str) {
        let first = match stmt.operands.first() {
            Some(op) => op.text.clone(),
            None => {
                log::warn!("EQU without a value");
                return;
            }
        };
        let value = self.expression_value(&first);
        let mut length = stmt.operands.get(1).and_then(|o| terms::self_defining_term(&o.text)).map(|v| v as u32);
        if length.is_none() {
            length = match self.ctx.ids().find(&first.to_uppercase()).and_then(|id| self.ctx.ord_ctx.get_symbol(&id)) {
                Some(s) => s.attributes.length,
                None if first=="*" => Some(1),
                None => None
            };
        }
        let ty = match stmt.operands.get(2).and_then(|o| terms::self_defining_term(&o.text)) {
            Some(t) => ebcdic::e2a(t as u8),
            None => 'U'
        };
        let mut attr = SymbolAttributes::new(SymbolOrigin::Equ,ty);
        attr.length = length;
        self.define_label(stmt,file,value,attr);
    }
    fn opsyn(&mut self,stmt: &Statement) {
        let mnemo = match ordinary_label(stmt) {
            Some(m) => self.ctx.add_id(&m),
            None => {
                log::warn!("OPSYN without a name");
                return;
            }
        };
        let target = match stmt.operands.first() {
            Some(op) if !op.text.is_empty() => op.text.to_uppercase(),
            _ => {
                self.ctx.remove_mnemonic(mnemo);
                return;
            }
        };
        let target_id = self.ctx.add_id(&target);
        if self.ctx.get_macro_definition(&target_id).is_none() && self.ctx.instruction_kind(&target_id).is_none() {
            self.load_library_macro(&target);
        }
        if let Err(e) = self.ctx.add_mnemonic(mnemo,target_id) {
            log::warn!("{}",e);
        }
    }
}

/// Analyze one open code file
pub fn analyze(uri: &str,text: &str,library: &dyn Library,settings: &Settings) -> LspContext {
    Analyzer::new(uri,text,library,settings).run(text)
}
