//! Instruction handbook
//!
//! Static catalogue of machine instructions, extended mnemonics, assembler
//! instructions and conditional-assembly instructions.  It feeds the context's
//! instruction map, the `O'` attribute, statement lengths, and the static
//! hover and completion text.

use std::collections::HashMap;
use crate::lang::{update_json_i64,update_json_string};

const JSON_STR: &str = include_str!("instructions.json");

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub enum InstructionKind {
    Machine,
    Mnemonic,
    Assembler,
    ConditionalAssembly
}

#[derive(Clone,Debug)]
pub struct Instruction {
    pub name: String,
    pub kind: InstructionKind,
    /// operand format, e.g. `R1,D2(X2,B2)`
    pub format: String,
    /// length in bytes, 0 for instructions that generate no machine code
    pub length: i64,
    /// for extended mnemonics, the instruction and mask they stand for
    pub base: String,
    pub brief: String,
    pub desc: String
}

impl Instruction {
    fn new(name: &str,kind: InstructionKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            format: String::new(),
            length: 0,
            base: String::new(),
            brief: String::new(),
            desc: String::new()
        }
    }
    /// One line summary used as completion detail
    pub fn detail(&self) -> String {
        match self.format.is_empty() {
            true => self.name.clone(),
            false => [&self.name," ",&self.format].concat()
        }
    }
}

/// This can panic if something is wrong with the JSON.
/// But the JSON is compiled in and practically never changes.
fn build_instructions() -> HashMap<String,Instruction> {
    let mut ans = HashMap::new();
    let root_val = serde_json::from_str::<serde_json::Value>(JSON_STR).expect("instruction handbook is malformed");
    if let Some(root) = root_val.as_object() {
        for (name,info) in root {
            let kind = match info.get("kind").and_then(|k| k.as_str()) {
                Some("machine") => InstructionKind::Machine,
                Some("mnemonic") => InstructionKind::Mnemonic,
                Some("assembler") => InstructionKind::Assembler,
                Some("ca") => InstructionKind::ConditionalAssembly,
                _ => {
                    log::warn!("skipping handbook entry {}",name);
                    continue;
                }
            };
            let mut ins = Instruction::new(name,kind);
            update_json_string(info,"format",&mut ins.format);
            update_json_i64(info,"length",&mut ins.length);
            update_json_string(info,"base",&mut ins.base);
            update_json_string(info,"brief",&mut ins.brief);
            update_json_string(info,"desc",&mut ins.desc);
            ans.insert(name.to_string(),ins);
        }
    }
    ans
}

pub struct InstructionHandbook {
    instructions: HashMap<String,Instruction>
}

impl InstructionHandbook {
    pub fn new() -> Self {
        Self {
            instructions: build_instructions()
        }
    }
    /// Case insensitive lookup
    pub fn get(&self,name: &str) -> Option<&Instruction> {
        self.instructions.get(&name.to_uppercase())
    }
    pub fn contains(&self,name: &str) -> bool {
        self.get(name).is_some()
    }
    /// Instructions sorted by name
    pub fn instructions(&self) -> Vec<&Instruction> {
        let mut ans: Vec<&Instruction> = self.instructions.values().collect();
        ans.sort_by(|a,b| a.name.cmp(&b.name));
        ans
    }
}
