//! # Ordinary symbol table
//!
//! Sections, location counters and the labels defined against them.
//! Values are either absolute or relative to the start of a section, there is no
//! general relocation algebra.  Every symbol keeps the processing stack that was live
//! when it was defined, the outline is built from that.

use std::collections::HashMap;
use super::ids::Id;
use super::processing::ProcessingStack;
use super::{DataAttrKind,Location};

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum SectionKind {
    Common,
    Dummy,
    Executable,
    Readonly
}

impl SectionKind {
    /// Value of `&SYSSTYP` for a section of this kind
    pub fn systyp(&self) -> &'static str {
        match self {
            Self::Common => "COM",
            Self::Dummy => "DSECT",
            Self::Executable => "CSECT",
            Self::Readonly => "RSECT"
        }
    }
}

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub struct SectionId(pub usize);

#[derive(Clone,Debug)]
pub struct LocationCounter {
    pub name: Id,
    pub offset: i32
}

#[derive(Clone,Debug)]
pub struct Section {
    pub name: Id,
    pub kind: SectionKind,
    counters: Vec<LocationCounter>,
    curr_counter: usize
}

impl Section {
    fn new(name: Id,kind: SectionKind) -> Self {
        Self {
            counters: vec![LocationCounter { name: name.clone(), offset: 0 }],
            name,
            kind,
            curr_counter: 0
        }
    }
    pub fn current_location_counter(&self) -> &LocationCounter {
        &self.counters[self.curr_counter]
    }
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum SymbolOrigin {
    Sect,
    Mach,
    Equ,
    Dat,
    Unknown
}

#[derive(Clone,Debug)]
pub struct SymbolAttributes {
    pub origin: SymbolOrigin,
    /// type attribute, EBCDIC
    pub type_attr: u8,
    pub length: Option<u32>,
    pub scale: Option<i16>,
    pub integer: Option<i32>
}

impl SymbolAttributes {
    pub fn new(origin: SymbolOrigin,type_attr: char) -> Self {
        Self {
            origin,
            type_attr: super::ebcdic::a2e(type_attr),
            length: None,
            scale: None,
            integer: None
        }
    }
    pub fn with_length(mut self,length: u32) -> Self {
        self.length = Some(length);
        self
    }
    pub fn is_defined(&self,attr: DataAttrKind) -> bool {
        match attr {
            DataAttrKind::T => true,
            DataAttrKind::L => self.length.is_some(),
            DataAttrKind::S => self.scale.is_some(),
            DataAttrKind::I => self.integer.is_some(),
            _ => false
        }
    }
    pub fn get_attribute_value(&self,attr: DataAttrKind) -> i32 {
        match attr {
            DataAttrKind::T => self.type_attr as i32,
            DataAttrKind::L => self.length.map_or(Self::default_value(attr),|l| l as i32),
            DataAttrKind::S => self.scale.map_or(Self::default_value(attr),|s| s as i32),
            DataAttrKind::I => self.integer.unwrap_or(Self::default_value(attr)),
            _ => Self::default_value(attr)
        }
    }
    /// Value an attribute reference produces when the symbol does not define it
    pub fn default_value(attr: DataAttrKind) -> i32 {
        match attr {
            DataAttrKind::L => 1,
            DataAttrKind::T => super::ebcdic::a2e('U') as i32,
            _ => 0
        }
    }
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct RelocValue {
    pub section: SectionId,
    pub offset: i32
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum SymbolValue {
    Abs(i32),
    Reloc(RelocValue),
    Undef
}

#[derive(Clone,Debug)]
pub struct Symbol {
    pub name: Id,
    pub value: SymbolValue,
    pub attributes: SymbolAttributes,
    pub location: Location,
    pub proc_stack: ProcessingStack
}

pub struct OrdinaryContext {
    sections: Vec<Section>,
    curr_section: Option<SectionId>,
    symbols: HashMap<Id,Symbol>,
    order: Vec<Id>,
    private_name: Id
}

impl OrdinaryContext {
    /// `private_name` names the unnamed section started by code that precedes any section statement
    pub fn new(private_name: Id) -> Self {
        Self {
            sections: Vec::new(),
            curr_section: None,
            symbols: HashMap::new(),
            order: Vec::new(),
            private_name
        }
    }
    pub fn symbol_defined(&self,name: &Id) -> bool {
        self.symbols.contains_key(name)
    }
    pub fn get_symbol(&self,name: &Id) -> Option<&Symbol> {
        self.symbols.get(name)
    }
    /// Symbols in order of definition
    pub fn symbols(&self) -> impl Iterator<Item=&Symbol> {
        self.order.iter().filter_map(|id| self.symbols.get(id))
    }
    pub fn current_section(&self) -> Option<&Section> {
        self.curr_section.and_then(|s| self.sections.get(s.0))
    }
    pub fn section(&self,id: SectionId) -> Option<&Section> {
        self.sections.get(id.0)
    }
    pub fn get_section(&self,name: &Id) -> Option<SectionId> {
        self.sections.iter().position(|s| &s.name==name).map(SectionId)
    }
    /// Define a symbol, returns false if the name is taken
    pub fn create_symbol(&mut self,name: Id,value: SymbolValue,attributes: SymbolAttributes,location: Location,proc_stack: ProcessingStack) -> bool {
        if name.is_empty() || self.symbol_defined(&name) {
            return false;
        }
        log::trace!("define symbol {}",name);
        self.order.push(name.clone());
        self.symbols.insert(name.clone(),Symbol { name, value, attributes, location, proc_stack });
        true
    }
    /// Start or continue a section, defining its name as a symbol the first time
    pub fn set_section(&mut self,name: Id,kind: SectionKind,location: Location,proc_stack: ProcessingStack) -> SectionId {
        if let Some(id) = self.get_section(&name) {
            if self.sections[id.0].kind==kind {
                self.curr_section = Some(id);
                return id;
            }
        }
        let id = SectionId(self.sections.len());
        self.sections.push(Section::new(name.clone(),kind));
        self.curr_section = Some(id);
        let attr = SymbolAttributes::new(SymbolOrigin::Sect,'J').with_length(1);
        self.create_symbol(name,SymbolValue::Reloc(RelocValue { section: id, offset: 0 }),attr,location,proc_stack);
        id
    }
    fn ensure_section(&mut self) -> SectionId {
        match self.curr_section {
            Some(id) => id,
            None => {
                let id = SectionId(self.sections.len());
                self.sections.push(Section::new(self.private_name.clone(),SectionKind::Executable));
                self.curr_section = Some(id);
                id
            }
        }
    }
    /// Switch to, or create, a location counter of the current section
    pub fn set_location_counter(&mut self,name: Id,location: Location,proc_stack: ProcessingStack) {
        let id = self.ensure_section();
        let sect = &mut self.sections[id.0];
        match sect.counters.iter().position(|c| c.name==name) {
            Some(i) => sect.curr_counter = i,
            None => {
                sect.counters.push(LocationCounter { name: name.clone(), offset: 0 });
                sect.curr_counter = sect.counters.len() - 1;
                let attr = SymbolAttributes::new(SymbolOrigin::Sect,'J').with_length(1);
                self.create_symbol(name,SymbolValue::Reloc(RelocValue { section: id, offset: 0 }),attr,location,proc_stack);
            }
        }
    }
    /// Value of the location counter, aligned to `alignment` bytes
    pub fn align(&mut self,alignment: i32) -> RelocValue {
        let id = self.ensure_section();
        let sect = &mut self.sections[id.0];
        let ctr = &mut sect.counters[sect.curr_counter];
        if alignment > 1 && ctr.offset % alignment != 0 {
            ctr.offset += alignment - ctr.offset % alignment;
        }
        RelocValue { section: id, offset: ctr.offset }
    }
    pub fn current_reloc(&mut self) -> RelocValue {
        self.align(1)
    }
    pub fn reserve(&mut self,length: i32) {
        let id = self.ensure_section();
        let sect = &mut self.sections[id.0];
        sect.counters[sect.curr_counter].offset += length;
    }
    /// Printable form of a relocatable value, e.g. `SECT+8`
    pub fn reloc_text(&self,reloc: &RelocValue) -> String {
        let name = match self.section(reloc.section) {
            Some(s) => s.name.to_string(),
            None => String::new()
        };
        match reloc.offset {
            0 => name,
            o if o < 0 => format!("{}{}",name,o),
            o => format!("{}+{}",name,o)
        }
    }
}
