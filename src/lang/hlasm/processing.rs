//! # Processing stack
//!
//! The processing stack is a value, rebuilt on demand from the source stack,
//! the copy cursors of each source, and the copy nests of every active macro
//! invocation.  Frames run from the outermost (open code) to the innermost.

use std::cell::RefCell;
use std::rc::Rc;
use super::ids::Id;
use super::macros::{CopyMemberInvocation,MacroInvocation};
use super::Location;

/// Kind of statement processing a frame performs
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum ProcessingKind {
    Ordinary,
    Lookahead,
    MacroDefinition,
    Copy
}

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub enum FileProcessingType {
    Opencode,
    Copy,
    Macro
}

#[derive(Clone,PartialEq,Debug)]
pub struct ProcessingFrame {
    pub proc_location: Location,
    /// macro or copy member name, `None` for open code
    pub member_name: Option<Id>,
    pub proc_type: FileProcessingType
}

impl ProcessingFrame {
    pub fn new(proc_location: Location,member_name: Option<Id>,proc_type: FileProcessingType) -> Self {
        Self { proc_location, member_name, proc_type }
    }
    /// Same file or member and the same kind, positions not considered
    pub fn same_member(&self,other: &ProcessingFrame) -> bool {
        self.proc_type==other.proc_type && match (&self.member_name,&other.member_name) {
            (Some(a),Some(b)) => a==b,
            (None,None) => self.proc_location.file==other.proc_location.file,
            _ => false
        }
    }
}

pub type ProcessingStack = Vec<ProcessingFrame>;

/// Entry of the processing-kind stack
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct ProcessingState {
    pub kind: ProcessingKind,
    pub owns_source: bool
}

/// Position within one owned source, open code or a macro library file
#[derive(Clone,Debug)]
pub struct SourceContext {
    pub current_instruction: Location,
    pub begin_index: usize,
    pub end_index: usize,
    pub end_line: usize,
    pub copy_stack: Vec<CopyMemberInvocation>
}

impl SourceContext {
    pub fn new(file: &str) -> Self {
        Self {
            current_instruction: Location::new(file,lsp_types::Position::new(0,0)),
            begin_index: 0,
            end_index: 0,
            end_line: 0,
            copy_stack: Vec::new()
        }
    }
    pub fn create_snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            instruction: self.current_instruction.clone(),
            begin_index: self.begin_index,
            end_index: self.end_index,
            end_line: self.end_line,
            copy_frames: self.copy_stack.iter().map(|c| CopyFrame {
                copy_member: c.name.clone(),
                statement_offset: c.current_statement
            }).collect()
        }
    }
}

#[derive(Clone,PartialEq,Debug)]
pub struct CopyFrame {
    pub copy_member: Id,
    pub statement_offset: usize
}

/// Position of the outermost source, enough to resume processing there
#[derive(Clone,PartialEq,Debug)]
pub struct SourceSnapshot {
    pub instruction: Location,
    pub begin_index: usize,
    pub end_index: usize,
    pub end_line: usize,
    pub copy_frames: Vec<CopyFrame>
}

/// Build the processing stack.
/// `macros` are the invocations of the macro scopes, outermost first.
pub fn build_processing_stack(sources: &[SourceContext],macros: &[Rc<RefCell<MacroInvocation>>]) -> ProcessingStack {
    let mut ans = ProcessingStack::new();
    for (i,source) in sources.iter().enumerate() {
        ans.push(ProcessingFrame::new(source.current_instruction.clone(),None,FileProcessingType::Opencode));
        for member in &source.copy_stack {
            ans.push(ProcessingFrame::new(member.current_location(),Some(member.name.clone()),FileProcessingType::Copy));
        }
        if i==0 {
            for invo in macros {
                let invo = invo.borrow();
                let nest = match invo.definition.copy_nests.get(invo.current_statement) {
                    Some(n) => n,
                    None => continue
                };
                for (k,item) in nest.iter().enumerate() {
                    match k {
                        0 => ans.push(ProcessingFrame::new(item.loc.clone(),Some(invo.id.clone()),FileProcessingType::Macro)),
                        _ => ans.push(ProcessingFrame::new(item.loc.clone(),item.member.clone(),FileProcessingType::Copy))
                    }
                }
            }
        }
    }
    ans
}
