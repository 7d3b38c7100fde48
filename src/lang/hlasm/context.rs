//! # Context engine
//!
//! `HlasmContext` holds everything one compilation unit needs while statements are
//! processed: the scope stack (open code at the bottom, one scope per active macro
//! call), the source stack with its copy cursors, the processing-kind stack,
//! the macro and copy registries, the mnemonic table and the ordinary symbols.
//!
//! The caller is expected to have resolved names before it asks for a transition.
//! Transitions that find otherwise return `hlasm::Error`.

use std::collections::{BTreeSet,HashMap};
use std::rc::Rc;
use lsp_types as lsp;
use super::ids::{Id,IdStorage};
use super::variables::{MacroData,SetType,SetValue,VariableKind,VariableSymbol,VarSymPtr};
use super::macros::{CopyMember,CopyMemberInvocation,LabelStorage,MacroArg,MacroDefinition,MacroInvoPtr,SequenceSymbol};
use super::processing::{build_processing_stack,ProcessingKind,ProcessingStack,ProcessingState,SourceContext,SourceSnapshot};
use super::ordinary::{OrdinaryContext,SymbolAttributes};
use super::handbook::{InstructionHandbook,InstructionKind};
use super::statement::Statement;
use super::settings::Settings;
use super::{ebcdic,terms};
use super::{DataAttrKind,Error,Location};

const RCH: &str = "unreachable was reached";

/// Activation record of open code or of one macro call
pub struct CodeScope {
    pub variables: HashMap<Id,VarSymPtr>,
    pub system_variables: HashMap<Id,VarSymPtr>,
    pub sequence_symbols: LabelStorage,
    pub this_macro: Option<MacroInvoPtr>,
    pub branch_counter: i32,
    pub branch_counter_change: i32
}

impl CodeScope {
    fn new(this_macro: Option<MacroInvoPtr>,branch_counter: i32) -> Self {
        Self {
            variables: HashMap::new(),
            system_variables: HashMap::new(),
            sequence_symbols: LabelStorage::new(),
            this_macro,
            branch_counter,
            branch_counter_change: 0
        }
    }
    pub fn is_in_macro(&self) -> bool {
        self.this_macro.is_some()
    }
}

pub struct HlasmContext {
    ids: IdStorage,
    handbook: Rc<InstructionHandbook>,
    instruction_map: HashMap<Id,InstructionKind>,
    opcode_mnemo: HashMap<Id,Id>,
    macros: HashMap<Id,Rc<MacroDefinition>>,
    copy_members: HashMap<Id,Rc<CopyMember>>,
    scope_stack: Vec<CodeScope>,
    source_stack: Vec<SourceContext>,
    proc_stack: Vec<ProcessingState>,
    /// user global SET symbols
    globals: HashMap<Id,VarSymPtr>,
    /// SYSDATC, SYSDATE, SYSTIME, SYSPARM, SYSOPT_RENT
    global_system_vars: HashMap<Id,VarSymPtr>,
    sysndx: u32,
    actr: i32,
    visited_files: BTreeSet<String>,
    opencode_file: String,
    pub ord_ctx: OrdinaryContext
}

impl HlasmContext {
    pub fn new(file_name: &str,settings: &Settings) -> Self {
        Self::new_at(file_name,settings,chrono::Local::now().naive_local())
    }
    /// Create the context as if the assembly started at `now`
    pub fn new_at(file_name: &str,settings: &Settings,now: chrono::NaiveDateTime) -> Self {
        let mut ids = IdStorage::new();
        let handbook = Rc::new(InstructionHandbook::new());
        let mut instruction_map = HashMap::new();
        for ins in handbook.instructions() {
            instruction_map.insert(ids.add(&ins.name),ins.kind);
        }
        let ord_ctx = OrdinaryContext::new(ids.empty_id());
        let mut ans = Self {
            ids,
            handbook,
            instruction_map,
            opcode_mnemo: HashMap::new(),
            macros: HashMap::new(),
            copy_members: HashMap::new(),
            scope_stack: Vec::new(),
            source_stack: Vec::new(),
            proc_stack: Vec::new(),
            globals: HashMap::new(),
            global_system_vars: HashMap::new(),
            sysndx: 0,
            actr: settings.actr as i32,
            visited_files: BTreeSet::new(),
            opencode_file: file_name.to_string(),
            ord_ctx
        };
        ans.add_global_system_vars(settings,now);
        ans.push_scope(None);
        ans.visited_files.insert(file_name.to_string());
        ans.push_statement_processing_with_source(ProcessingKind::Ordinary,file_name);
        ans
    }
    fn add_global_system_vars(&mut self,settings: &Settings,now: chrono::NaiveDateTime) {
        let vars = [
            ("SYSDATC",SetValue::C(now.format("%Y%m%d").to_string())),
            ("SYSDATE",SetValue::C(now.format("%m/%d/%y").to_string())),
            ("SYSTIME",SetValue::C(now.format("%H:%M").to_string())),
            ("SYSPARM",SetValue::C(settings.sysparm.clone())),
            ("SYSOPT_RENT",SetValue::B(settings.rent))
        ];
        for (name,val) in vars {
            let id = self.ids.add(name);
            let ty = match val { SetValue::B(_) => SetType::B, _ => SetType::C };
            let mut var = VariableSymbol::new_set(id.clone(),ty,true,true);
            var.set(None,val);
            self.global_system_vars.insert(id,var.into_ptr());
        }
    }
    fn push_scope(&mut self,this_macro: Option<MacroInvoPtr>) {
        let mut scope = CodeScope::new(this_macro,self.actr);
        for (id,var) in &self.global_system_vars {
            scope.variables.insert(id.clone(),Rc::clone(var));
        }
        self.scope_stack.push(scope);
    }
    fn curr_scope_mut(&mut self) -> &mut CodeScope {
        self.scope_stack.last_mut().expect(RCH)
    }
    fn add_system_vars_to_scope(&mut self) {
        let (sysect,systyp,sysloc) = match self.ord_ctx.current_section() {
            Some(sect) => (
                sect.name.to_string(),
                sect.kind.systyp().to_string(),
                sect.current_location_counter().name.to_string()
            ),
            None => (String::new(),String::new(),String::new())
        };
        let mut sysmac = Vec::new();
        for scope in self.scope_stack.iter().rev() {
            match &scope.this_macro {
                Some(m) => sysmac.push(MacroData::Single(m.borrow().id.to_string())),
                None => sysmac.push(MacroData::Single("OPEN CODE".to_string()))
            }
        }
        let vars = [
            ("SYSECT",SetValue::C(sysect)),
            ("SYSNDX",SetValue::A(self.sysndx as i32)),
            ("SYSSTYP",SetValue::C(systyp)),
            ("SYSLOC",SetValue::C(sysloc)),
            ("SYSNEST",SetValue::A(self.scope_stack.len() as i32 - 1))
        ];
        for (name,val) in vars {
            let id = self.ids.add(name);
            let ty = match val { SetValue::A(_) => SetType::A, _ => SetType::C };
            let mut var = VariableSymbol::new_set(id.clone(),ty,true,false);
            var.set(None,val);
            self.curr_scope_mut().variables.insert(id,var.into_ptr());
        }
        let id = self.ids.add("SYSMAC");
        let sysmac = VariableSymbol::new_syslist(id.clone(),MacroData::Composite(sysmac)).into_ptr();
        self.curr_scope_mut().system_variables.insert(id,sysmac);
    }

    pub fn ids(&self) -> &IdStorage {
        &self.ids
    }
    pub fn ids_mut(&mut self) -> &mut IdStorage {
        &mut self.ids
    }
    /// Intern a name
    pub fn add_id(&mut self,s: &str) -> Id {
        self.ids.add(s)
    }
    pub fn handbook(&self) -> &Rc<InstructionHandbook> {
        &self.handbook
    }
    pub fn opencode_file_name(&self) -> &str {
        &self.opencode_file
    }
    pub fn visited_files(&self) -> &BTreeSet<String> {
        &self.visited_files
    }
    pub fn scope_stack(&self) -> &[CodeScope] {
        &self.scope_stack
    }
    pub fn current_scope(&self) -> &CodeScope {
        self.scope_stack.last().expect(RCH)
    }
    pub fn is_in_macro(&self) -> bool {
        self.scope_stack.len() > 1
    }
    pub fn this_macro(&self) -> Option<MacroInvoPtr> {
        self.current_scope().this_macro.clone()
    }
    /// User global SET symbols
    pub fn globals(&self) -> &HashMap<Id,VarSymPtr> {
        &self.globals
    }
    pub fn global_system_vars(&self) -> &HashMap<Id,VarSymPtr> {
        &self.global_system_vars
    }
    /// Value the next macro call will see as `&SYSNDX`
    pub fn sysndx(&self) -> u32 {
        self.sysndx
    }

    // source and processing stacks

    pub fn source_stack(&self) -> &[SourceContext] {
        &self.source_stack
    }
    pub fn current_source(&self) -> &SourceContext {
        self.source_stack.last().expect(RCH)
    }
    fn current_source_mut(&mut self) -> &mut SourceContext {
        self.source_stack.last_mut().expect(RCH)
    }
    pub fn set_source_position(&mut self,pos: lsp::Position) {
        self.current_source_mut().current_instruction.pos = pos;
    }
    pub fn set_source_indices(&mut self,begin_index: usize,end_index: usize,end_line: usize) {
        let src = self.current_source_mut();
        src.begin_index = begin_index;
        src.end_index = end_index;
        src.end_line = end_line;
    }
    pub fn current_copy_stack(&self) -> &[CopyMemberInvocation] {
        &self.current_source().copy_stack
    }
    pub fn current_copy_stack_mut(&mut self) -> &mut Vec<CopyMemberInvocation> {
        &mut self.current_source_mut().copy_stack
    }
    /// Names of the copy members open in every source, outermost first
    pub fn whole_copy_stack(&self) -> Vec<Id> {
        self.source_stack.iter()
            .flat_map(|src| src.copy_stack.iter().map(|c| c.name.clone()))
            .collect()
    }
    /// Reuse the current source, e.g. for lookahead
    pub fn push_statement_processing(&mut self,kind: ProcessingKind) {
        log::trace!("push processing {:?}",kind);
        self.proc_stack.push(ProcessingState { kind, owns_source: false });
    }
    /// Push a new source for `file_name` along with the processing frame
    pub fn push_statement_processing_with_source(&mut self,kind: ProcessingKind,file_name: &str) {
        log::trace!("push processing {:?} with source {}",kind,file_name);
        self.source_stack.push(SourceContext::new(file_name));
        self.proc_stack.push(ProcessingState { kind, owns_source: true });
    }
    pub fn pop_statement_processing(&mut self) -> Result<(),Error> {
        if self.proc_stack.len() < 2 {
            return Err(Error::ProcessingUnderflow);
        }
        if let Some(state) = self.proc_stack.pop() {
            log::trace!("pop processing {:?}",state.kind);
            if state.owns_source {
                self.source_stack.pop();
            }
        }
        Ok(())
    }
    pub fn processing_kind(&self) -> ProcessingKind {
        self.proc_stack.last().expect(RCH).kind
    }
    /// Snapshot of the full nesting path at the current statement
    pub fn processing_stack(&self) -> ProcessingStack {
        let macros: Vec<MacroInvoPtr> = self.scope_stack.iter().filter_map(|s| s.this_macro.clone()).collect();
        build_processing_stack(&self.source_stack,&macros)
    }
    pub fn capture_snapshot(&self) -> SourceSnapshot {
        self.current_source().create_snapshot()
    }
    /// Reposition the outermost source, only valid when it is the only processing frame
    pub fn apply_source_snapshot(&mut self,snapshot: SourceSnapshot) -> Result<(),Error> {
        if self.proc_stack.len() != 1 {
            return Err(Error::SnapshotDepth);
        }
        let mut cursors = Vec::new();
        for frame in &snapshot.copy_frames {
            let member = match self.copy_members.get(&frame.copy_member) {
                Some(m) => m,
                None => return Err(Error::UnknownCopyMember(frame.copy_member.to_string()))
            };
            let mut invo = member.enter();
            invo.current_statement = frame.statement_offset;
            cursors.push(invo);
        }
        let src = self.current_source_mut();
        src.current_instruction = snapshot.instruction;
        src.begin_index = snapshot.begin_index;
        src.end_index = snapshot.end_index;
        src.end_line = snapshot.end_line;
        src.copy_stack = cursors;
        Ok(())
    }

    // variables

    /// Variable visible in the current scope, macro parameters come last
    pub fn get_var_sym(&self,name: &Id) -> Option<VarSymPtr> {
        let scope = self.current_scope();
        if let Some(v) = scope.variables.get(name) {
            return Some(Rc::clone(v));
        }
        if let Some(v) = scope.system_variables.get(name) {
            return Some(Rc::clone(v));
        }
        if let Some(m) = &scope.this_macro {
            if let Some(v) = m.borrow().named_params.get(name) {
                return Some(Rc::clone(v));
            }
        }
        None
    }
    /// Declare a local SET symbol, an existing declaration in this scope is kept
    pub fn create_local_variable(&mut self,name: Id,ty: SetType,is_scalar: bool) -> VarSymPtr {
        let scope = self.curr_scope_mut();
        if let Some(v) = scope.variables.get(&name) {
            return Rc::clone(v);
        }
        let var = VariableSymbol::new_set(name.clone(),ty,is_scalar,false).into_ptr();
        scope.variables.insert(name,Rc::clone(&var));
        var
    }
    /// Declare a global SET symbol, every declaring scope shares one cell
    pub fn create_global_variable(&mut self,name: Id,ty: SetType,is_scalar: bool) -> VarSymPtr {
        let var = match self.globals.get(&name) {
            Some(v) => Rc::clone(v),
            None => {
                let v = VariableSymbol::new_set(name.clone(),ty,is_scalar,true).into_ptr();
                self.globals.insert(name.clone(),Rc::clone(&v));
                v
            }
        };
        self.curr_scope_mut().variables.insert(name,Rc::clone(&var));
        var
    }

    // sequence symbols and branch counter

    pub fn add_sequence_symbol(&mut self,seq: SequenceSymbol) -> Result<(),Error> {
        if self.is_in_macro() {
            return Err(Error::SequenceSymbolInMacro);
        }
        let scope = self.curr_scope_mut();
        if !scope.sequence_symbols.contains_key(&seq.name) {
            scope.sequence_symbols.insert(seq.name.clone(),Rc::new(seq));
        }
        Ok(())
    }
    /// Inside a macro the labels of its definition, otherwise the open code table
    pub fn get_sequence_symbol(&self,name: &Id) -> Option<Rc<SequenceSymbol>> {
        let scope = self.current_scope();
        match &scope.this_macro {
            Some(m) => m.borrow().definition.labels.get(name).cloned(),
            None => scope.sequence_symbols.get(name).cloned()
        }
    }
    pub fn set_branch_counter(&mut self,value: i32) {
        let scope = self.curr_scope_mut();
        scope.branch_counter = value;
        scope.branch_counter_change += 1;
    }
    pub fn get_branch_counter(&self) -> i32 {
        self.current_scope().branch_counter
    }
    pub fn decrement_branch_counter(&mut self) {
        self.curr_scope_mut().branch_counter -= 1;
    }
    /// Number of times the branch counter of this scope was set
    pub fn branch_counter_change(&self) -> i32 {
        self.current_scope().branch_counter_change
    }

    // operation codes

    pub fn instruction_kind(&self,name: &Id) -> Option<InstructionKind> {
        self.instruction_map.get(name).copied()
    }
    /// Make `mnemo` a synonym of `op_code`, which may itself be a synonym
    pub fn add_mnemonic(&mut self,mnemo: Id,op_code: Id) -> Result<(),Error> {
        let target = if let Some(t) = self.opcode_mnemo.get(&op_code) {
            t.clone()
        } else if self.macros.contains_key(&op_code) || self.instruction_map.contains_key(&op_code) {
            op_code
        } else {
            return Err(Error::UndefinedOpcode(op_code.to_string()));
        };
        log::debug!("opsyn {} -> {}",mnemo,target);
        self.opcode_mnemo.insert(mnemo,target);
        Ok(())
    }
    pub fn remove_mnemonic(&mut self,mnemo: Id) {
        self.opcode_mnemo.insert(mnemo,self.ids.empty_id());
    }
    /// Resolved operation code.  A synonym whose target was removed resolves to the empty id.
    pub fn get_mnemonic_opcode(&self,mnemo: &Id) -> Id {
        match self.opcode_mnemo.get(mnemo) {
            Some(target) => match self.opcode_mnemo.get(target) {
                Some(t) if target != mnemo && t.is_empty() => t.clone(),
                _ => target.clone()
            },
            None => mnemo.clone()
        }
    }

    // attributes

    /// `K'`, `N'` and `T'` of a variable reference, other attributes apply to the symbol the value names
    pub fn get_attribute_value_var(&self,attr: DataAttrKind,var: Option<&VarSymPtr>,offset: &[usize]) -> SetValue {
        match attr {
            DataAttrKind::K => SetValue::A(var.map_or(0,|v| v.borrow().count(offset))),
            DataAttrKind::N => SetValue::A(var.map_or(0,|v| v.borrow().number(offset))),
            DataAttrKind::T => SetValue::C(self.get_type_attr(var,offset)),
            _ => {
                let name = match var {
                    Some(v) => v.borrow().get_value(offset).to_c().to_uppercase(),
                    None => String::new()
                };
                match self.ids.find(&name) {
                    Some(id) => self.get_attribute_value_symbol(attr,&id),
                    None => Self::undefined_symbol_attr(attr)
                }
            }
        }
    }
    fn undefined_symbol_attr(attr: DataAttrKind) -> SetValue {
        match attr {
            DataAttrKind::T => SetValue::C("U".to_string()),
            DataAttrKind::O => SetValue::C("U".to_string()),
            DataAttrKind::D => SetValue::A(0),
            _ => SetValue::A(SymbolAttributes::default_value(attr))
        }
    }
    /// Attribute of an ordinary symbol or operation code named `symbol_name`
    pub fn get_attribute_value_symbol(&self,attr: DataAttrKind,symbol_name: &Id) -> SetValue {
        let sym = self.ord_ctx.get_symbol(symbol_name);
        match attr {
            DataAttrKind::D => SetValue::A(match sym { Some(_) => 1, None => 0 }),
            DataAttrKind::O => SetValue::C(self.get_opcode_attr(symbol_name)),
            DataAttrKind::T => SetValue::C(match sym {
                Some(s) => ebcdic::type_attr_string(s.attributes.type_attr),
                None => "U".to_string()
            }),
            _ => match sym {
                Some(s) => SetValue::A(s.attributes.get_attribute_value(attr)),
                None => Self::undefined_symbol_attr(attr)
            }
        }
    }
    /// Type attribute of a variable reference
    pub fn get_type_attr(&self,var: Option<&VarSymPtr>,offset: &[usize]) -> String {
        let var = match var {
            Some(v) => v.borrow(),
            None => return "U".to_string()
        };
        let value = match &var.kind {
            VariableKind::Set(s) => {
                if s.ty != SetType::C {
                    return "N".to_string();
                }
                s.value_of(offset).to_c()
            },
            _ => {
                let mut data = match var.get_data(offset) {
                    Some(d) => d,
                    None => return "U".to_string()
                };
                while data.is_composite() {
                    data = data.get_ith(1);
                }
                data.get_value()
            }
        };
        if value.is_empty() {
            return "O".to_string();
        }
        if terms::is_self_defining_term(&value) {
            return "N".to_string();
        }
        if let Some(id) = self.ids.find(&value.to_uppercase()) {
            if let Some(sym) = self.ord_ctx.get_symbol(&id) {
                return ebcdic::type_attr_string(sym.attributes.type_attr);
            }
        }
        "U".to_string()
    }
    /// `O'` attribute: M, A, E, O or U
    pub fn get_opcode_attr(&self,symbol: &Id) -> String {
        if self.macros.contains_key(symbol) {
            return "M".to_string();
        }
        let ans = match self.instruction_map.get(symbol) {
            Some(InstructionKind::Assembler) | Some(InstructionKind::ConditionalAssembly) => "A",
            Some(InstructionKind::Mnemonic) => "E",
            Some(InstructionKind::Machine) => "O",
            None => "U"
        };
        ans.to_string()
    }

    // macros

    /// Register a macro, replacing any earlier definition with the same name
    pub fn add_macro(&mut self,def: MacroDefinition) -> Rc<MacroDefinition> {
        log::debug!("add macro {}",def.id);
        let ans = Rc::new(def);
        self.macros.insert(ans.id.clone(),Rc::clone(&ans));
        ans
    }
    pub fn macros(&self) -> &HashMap<Id,Rc<MacroDefinition>> {
        &self.macros
    }
    pub fn get_macro_definition(&self,name: &Id) -> Option<Rc<MacroDefinition>> {
        self.macros.get(name).cloned()
    }
    pub fn enter_macro(&mut self,name: &Id,label_data: Option<MacroData>,args: Vec<MacroArg>) -> Result<MacroInvoPtr,Error> {
        let def = match self.macros.get(name) {
            Some(d) => Rc::clone(d),
            None => return Err(Error::UnknownMacro(name.to_string()))
        };
        let syslist = self.ids.add("SYSLIST");
        let invo = def.call(label_data,args,syslist);
        log::trace!("enter scope {}",name);
        self.push_scope(Some(Rc::clone(&invo)));
        self.add_system_vars_to_scope();
        self.visited_files.insert(def.definition_location.file.clone());
        self.sysndx += 1;
        Ok(invo)
    }
    pub fn leave_macro(&mut self) -> Result<(),Error> {
        if self.scope_stack.len() < 2 {
            return Err(Error::OpenCodeExit);
        }
        if let Some(scope) = self.scope_stack.pop() {
            if let Some(m) = scope.this_macro {
                log::trace!("leave scope {}",m.borrow().id);
            }
        }
        Ok(())
    }

    // copy members

    /// Register a copy member, a second registration of the same name is ignored
    pub fn add_copy_member(&mut self,name: Id,body: Vec<Statement>,definition_location: Location) -> Rc<CopyMember> {
        self.visited_files.insert(definition_location.file.clone());
        if let Some(existing) = self.copy_members.get(&name) {
            return Rc::clone(existing);
        }
        log::debug!("add copy member {}",name);
        let member = Rc::new(CopyMember { name: name.clone(), body, definition_location });
        self.copy_members.insert(name,Rc::clone(&member));
        member
    }
    pub fn copy_members(&self) -> &HashMap<Id,Rc<CopyMember>> {
        &self.copy_members
    }
    pub fn get_copy_member(&self,name: &Id) -> Option<Rc<CopyMember>> {
        self.copy_members.get(name).cloned()
    }
    /// Push a fresh cursor over the member onto the current source's copy stack
    pub fn enter_copy_member(&mut self,name: &Id) -> Result<(),Error> {
        let member = match self.copy_members.get(name) {
            Some(m) => Rc::clone(m),
            None => return Err(Error::UnknownCopyMember(name.to_string()))
        };
        log::trace!("enter copy {}",name);
        self.current_copy_stack_mut().push(member.enter());
        Ok(())
    }
    pub fn leave_copy_member(&mut self) -> Result<(),Error> {
        match self.current_copy_stack_mut().pop() {
            Some(c) => {
                log::trace!("leave copy {}",c.name);
                Ok(())
            },
            None => Err(Error::CopyUnderflow)
        }
    }
}
