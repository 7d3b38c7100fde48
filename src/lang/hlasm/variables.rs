//! # Variable symbols
//!
//! SET symbols and macro parameters share one closed enumeration.
//! Subscripts (`offset`) follow the assembler's convention: they are 1-based and
//! an empty slice means "the whole value".
//!
//! Variables are handed around as `VarSymPtr`, a shared cell, so the global system
//! variables can sit in every scope's table at once.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use super::ids::Id;

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum SetType {
    A,
    B,
    C
}

#[derive(Clone,PartialEq,Eq,Debug)]
pub enum SetValue {
    A(i32),
    B(bool),
    C(String)
}

impl SetValue {
    pub fn default_of(ty: SetType) -> Self {
        match ty {
            SetType::A => Self::A(0),
            SetType::B => Self::B(false),
            SetType::C => Self::C(String::new())
        }
    }
    /// Character representation, as used when the value is substituted into source.
    /// Arithmetic values substitute as their magnitude.
    pub fn to_c(&self) -> String {
        match self {
            Self::A(a) => a.unsigned_abs().to_string(),
            Self::B(b) => if *b { "1".to_string() } else { "0".to_string() },
            Self::C(c) => c.clone()
        }
    }
    /// Convert to the given type, the way SET assignment coerces values
    pub fn coerce(self,ty: SetType) -> Self {
        match (ty,self) {
            (SetType::A,Self::B(b)) => Self::A(b as i32),
            (SetType::A,Self::C(c)) => Self::A(super::terms::self_defining_term(&c).unwrap_or(0)),
            (SetType::B,Self::A(a)) => Self::B(a!=0),
            (SetType::B,Self::C(c)) => Self::B(c=="1"),
            (SetType::C,v) => Self::C(v.to_c()),
            (_,v) => v
        }
    }
}

/// Data bound to a macro parameter
#[derive(Clone,PartialEq,Debug)]
pub enum MacroData {
    Dummy,
    Single(String),
    Composite(Vec<MacroData>)
}

static DUMMY: MacroData = MacroData::Dummy;

impl MacroData {
    /// Parse an operand as written, `(A,B,(C))` becomes a composite
    pub fn from_operand(s: &str) -> Self {
        if s.is_empty() {
            return Self::Dummy;
        }
        if s.starts_with('(') && s.ends_with(')') && s.len()>1 {
            let inner = &s[1..s.len()-1];
            let items = super::statement::split_operands(inner);
            return Self::Composite(items.iter().map(|i| Self::from_operand(i)).collect());
        }
        Self::Single(s.to_string())
    }
    pub fn get_value(&self) -> String {
        match self {
            Self::Dummy => String::new(),
            Self::Single(s) => s.clone(),
            Self::Composite(v) => {
                let items: Vec<String> = v.iter().map(|d| d.get_value()).collect();
                ["(",&items.join(","),")"].concat()
            }
        }
    }
    /// Subscripted access, 1-based, out of range yields the dummy
    pub fn get_ith(&self,idx: usize) -> &MacroData {
        match self {
            Self::Dummy => &DUMMY,
            Self::Single(_) => if idx==1 { self } else { &DUMMY },
            Self::Composite(v) => match idx.checked_sub(1).and_then(|i| v.get(i)) {
                Some(d) => d,
                None => &DUMMY
            }
        }
    }
    pub fn number(&self) -> i32 {
        match self {
            Self::Dummy => 0,
            Self::Single(s) => if s.is_empty() { 0 } else { 1 },
            Self::Composite(v) => v.len() as i32
        }
    }
    pub fn count(&self) -> i32 {
        self.get_value().chars().count() as i32
    }
    pub fn is_composite(&self) -> bool {
        matches!(self,Self::Composite(_))
    }
}

/// A SET symbol, scalar or subscripted
#[derive(Clone,Debug)]
pub struct SetSymbol {
    pub ty: SetType,
    pub is_scalar: bool,
    pub is_global: bool,
    scalar: SetValue,
    array: BTreeMap<usize,SetValue>
}

impl SetSymbol {
    pub fn new(ty: SetType,is_scalar: bool,is_global: bool) -> Self {
        Self {
            ty,
            is_scalar,
            is_global,
            scalar: SetValue::default_of(ty),
            array: BTreeMap::new()
        }
    }
    pub fn get_value(&self) -> SetValue {
        self.scalar.clone()
    }
    pub fn get_value_at(&self,idx: usize) -> SetValue {
        match self.array.get(&idx) {
            Some(v) => v.clone(),
            None => SetValue::default_of(self.ty)
        }
    }
    pub fn set_value(&mut self,val: SetValue) {
        self.scalar = val.coerce(self.ty);
    }
    pub fn set_value_at(&mut self,idx: usize,val: SetValue) {
        self.array.insert(idx,val.coerce(self.ty));
    }
    /// Value addressed by `offset`, scalars ignore the subscript
    pub fn value_of(&self,offset: &[usize]) -> SetValue {
        match (self.is_scalar,offset.first()) {
            (false,Some(idx)) => self.get_value_at(*idx),
            _ => self.get_value()
        }
    }
    /// Largest subscript that has been assigned
    pub fn max_subscript(&self) -> usize {
        match self.array.keys().last() {
            Some(k) => *k,
            None => 0
        }
    }
}

#[derive(Clone,Debug)]
pub enum VariableKind {
    Set(SetSymbol),
    Positional { position: usize, data: MacroData },
    Keyword { default: MacroData, data: Option<MacroData> },
    /// list whose first subscript is 0-based, as `&SYSLIST` and `&SYSMAC`
    SysList { data: MacroData }
}

#[derive(Clone,Debug)]
pub struct VariableSymbol {
    pub id: Id,
    pub kind: VariableKind
}

pub type VarSymPtr = Rc<RefCell<VariableSymbol>>;

impl VariableSymbol {
    pub fn new_set(id: Id,ty: SetType,is_scalar: bool,is_global: bool) -> Self {
        Self { id, kind: VariableKind::Set(SetSymbol::new(ty,is_scalar,is_global)) }
    }
    pub fn new_positional(id: Id,position: usize,data: MacroData) -> Self {
        Self { id, kind: VariableKind::Positional { position, data } }
    }
    pub fn new_keyword(id: Id,default: MacroData,data: Option<MacroData>) -> Self {
        Self { id, kind: VariableKind::Keyword { default, data } }
    }
    pub fn new_syslist(id: Id,data: MacroData) -> Self {
        Self { id, kind: VariableKind::SysList { data } }
    }
    pub fn into_ptr(self) -> VarSymPtr {
        Rc::new(RefCell::new(self))
    }
    pub fn is_scalar(&self) -> bool {
        match &self.kind {
            VariableKind::Set(s) => s.is_scalar,
            _ => true
        }
    }
    pub fn access_set_symbol_mut(&mut self) -> Option<&mut SetSymbol> {
        match &mut self.kind {
            VariableKind::Set(s) => Some(s),
            _ => None
        }
    }
    /// Macro parameter data addressed by `offset`, `None` for SET symbols
    pub fn get_data(&self,offset: &[usize]) -> Option<&MacroData> {
        let mut data = match &self.kind {
            VariableKind::Set(_) => return None,
            VariableKind::Positional { data, .. } => data,
            VariableKind::Keyword { default, data } => match data {
                Some(d) => d,
                None => default
            },
            VariableKind::SysList { data } => {
                let mut ans = data;
                for (i,idx) in offset.iter().enumerate() {
                    ans = match i {
                        0 => ans.get_ith(*idx+1),
                        _ => ans.get_ith(*idx)
                    };
                }
                return Some(ans);
            }
        };
        for idx in offset {
            data = data.get_ith(*idx);
        }
        Some(data)
    }
    pub fn get_value(&self,offset: &[usize]) -> SetValue {
        match &self.kind {
            VariableKind::Set(s) => s.value_of(offset),
            _ => SetValue::C(match self.get_data(offset) {
                Some(d) => d.get_value(),
                None => String::new()
            })
        }
    }
    /// `K'` attribute: number of characters in the value
    pub fn count(&self,offset: &[usize]) -> i32 {
        match &self.kind {
            VariableKind::Set(s) => match s.value_of(offset) {
                SetValue::A(a) => a.unsigned_abs().to_string().len() as i32,
                SetValue::B(_) => 1,
                SetValue::C(c) => c.chars().count() as i32
            },
            _ => match self.get_data(offset) {
                Some(d) => d.count(),
                None => 0
            }
        }
    }
    /// `N'` attribute: number of sublist items, or the largest subscript of a SET array
    pub fn number(&self,offset: &[usize]) -> i32 {
        match &self.kind {
            VariableKind::Set(s) => if s.is_scalar { 0 } else { s.max_subscript() as i32 },
            VariableKind::SysList { data } if offset.is_empty() => (data.number() - 1).max(0),
            _ => match self.get_data(offset) {
                Some(d) => d.number(),
                None => 0
            }
        }
    }
    /// Assign a SET symbol, `idx` selects an array element.  Returns false for parameters.
    pub fn set(&mut self,idx: Option<usize>,val: SetValue) -> bool {
        match (self.access_set_symbol_mut(),idx) {
            (Some(s),Some(i)) if !s.is_scalar => { s.set_value_at(i,val); true },
            (Some(s),_) => { s.set_value(val); true },
            (None,_) => false
        }
    }
}
