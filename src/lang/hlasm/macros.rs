//! # Macros and copy members
//!
//! Definitions are immutable once registered and shared through `Rc`.
//! Each call of a macro produces a fresh `MacroInvocation`, each entry into a
//! copy member a fresh `CopyMemberInvocation` cursor.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use super::ids::Id;
use super::statement::Statement;
use super::variables::{MacroData,VariableSymbol,VarSymPtr};
use super::Location;

#[derive(Clone,Debug)]
pub struct SequenceSymbol {
    pub name: Id,
    pub location: Location,
    /// index of the labeled statement in the list that contains it
    pub statement_offset: usize
}

pub type LabelStorage = HashMap<Id,Rc<SequenceSymbol>>;

/// One level of copy nesting for a macro statement.
/// The first item locates the statement within the macro definition, the
/// rest locate it within each nested copy member.
#[derive(Clone,PartialEq,Debug)]
pub struct CopyNestItem {
    pub loc: Location,
    pub member: Option<Id>
}

pub type CopyNests = Vec<Vec<CopyNestItem>>;

/// Prototype parameter, keyword parameters carry a default
#[derive(Clone,Debug)]
pub struct MacroParamDef {
    pub id: Id,
    pub default: Option<MacroData>
}

/// Actual argument, keyword arguments carry the keyword
#[derive(Clone,Debug)]
pub struct MacroArg {
    pub keyword: Option<Id>,
    pub data: MacroData
}

#[derive(Debug)]
pub struct MacroDefinition {
    pub id: Id,
    pub label_param: Option<Id>,
    /// prototype parameters in order of appearance
    pub params: Vec<MacroParamDef>,
    pub body: Vec<Statement>,
    pub copy_nests: CopyNests,
    pub labels: LabelStorage,
    pub definition_location: Location
}

impl MacroDefinition {
    pub fn positional_params(&self) -> impl Iterator<Item=&MacroParamDef> {
        self.params.iter().filter(|p| p.default.is_none())
    }
    pub fn keyword_params(&self) -> impl Iterator<Item=&MacroParamDef> {
        self.params.iter().filter(|p| p.default.is_some())
    }
    fn is_keyword(&self,id: &Id) -> bool {
        self.keyword_params().any(|p| &p.id==id)
    }
    /// Bind actual arguments into a new invocation.
    /// Unknown keywords are kept as positional text `KEY=VALUE`.
    pub fn call(self: &Rc<Self>,label_data: Option<MacroData>,args: Vec<MacroArg>,syslist: Id) -> MacroInvoPtr {
        let mut positional_args: Vec<MacroData> = Vec::new();
        let mut keyword_args: HashMap<Id,MacroData> = HashMap::new();
        for arg in args {
            match arg.keyword {
                Some(k) if self.is_keyword(&k) => {
                    keyword_args.insert(k,arg.data);
                },
                Some(k) => positional_args.push(MacroData::Single(format!("{}={}",k,arg.data.get_value()))),
                None => positional_args.push(arg.data)
            }
        }
        let label_data = label_data.unwrap_or(MacroData::Dummy);
        let mut named_params: HashMap<Id,VarSymPtr> = HashMap::new();
        if let Some(lbl) = &self.label_param {
            named_params.insert(lbl.clone(),VariableSymbol::new_positional(lbl.clone(),0,label_data.clone()).into_ptr());
        }
        for (i,p) in self.positional_params().enumerate() {
            let data = positional_args.get(i).cloned().unwrap_or(MacroData::Dummy);
            named_params.insert(p.id.clone(),VariableSymbol::new_positional(p.id.clone(),i+1,data).into_ptr());
        }
        for p in self.keyword_params() {
            let default = p.default.clone().unwrap_or(MacroData::Dummy);
            let data = keyword_args.remove(&p.id);
            named_params.insert(p.id.clone(),VariableSymbol::new_keyword(p.id.clone(),default,data).into_ptr());
        }
        let mut list = vec![label_data];
        list.append(&mut positional_args);
        named_params.insert(syslist.clone(),VariableSymbol::new_syslist(syslist,MacroData::Composite(list)).into_ptr());
        Rc::new(RefCell::new(MacroInvocation {
            id: self.id.clone(),
            named_params,
            definition: Rc::clone(self),
            current_statement: 0
        }))
    }
}

/// One call of a macro
#[derive(Debug)]
pub struct MacroInvocation {
    pub id: Id,
    pub named_params: HashMap<Id,VarSymPtr>,
    pub definition: Rc<MacroDefinition>,
    pub current_statement: usize
}

pub type MacroInvoPtr = Rc<RefCell<MacroInvocation>>;

#[derive(Debug)]
pub struct CopyMember {
    pub name: Id,
    pub body: Vec<Statement>,
    pub definition_location: Location
}

impl CopyMember {
    /// Start a new cursor over the member
    pub fn enter(self: &Rc<Self>) -> CopyMemberInvocation {
        CopyMemberInvocation {
            name: self.name.clone(),
            member: Rc::clone(self),
            current_statement: 0
        }
    }
}

#[derive(Clone,Debug)]
pub struct CopyMemberInvocation {
    pub name: Id,
    pub member: Rc<CopyMember>,
    pub current_statement: usize
}

impl CopyMemberInvocation {
    /// Location of the current statement in the member's file
    pub fn current_location(&self) -> Location {
        match self.member.body.get(self.current_statement) {
            Some(stmt) => Location::new(&self.member.definition_location.file,stmt.position()),
            None => self.member.definition_location.clone()
        }
    }
}
