//! # Statements
//!
//! Fixed-format source is split into statements here.
//! * `*` or `.*` in column 1 starts a comment line
//! * the label begins in column 1, a blank column 1 means no label
//! * a non-blank in column 72 continues the statement, which resumes in column 16
//! * columns 73-80 are ignored
//!
//! Fields remember their ranges in the physical source, so a continued operand
//! can have a range that spans lines.

use lsp_types as lsp;

pub const CONTINUATION_COLUMN: usize = 71;
pub const CONTINUE_COLUMN: usize = 15;

#[derive(Clone,Debug,PartialEq)]
pub struct Field {
    pub text: String,
    pub range: lsp::Range
}

impl Field {
    pub fn new(text: &str,range: lsp::Range) -> Self {
        Self { text: text.to_string(), range }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub struct Statement {
    pub label: Option<Field>,
    pub instruction: Option<Field>,
    /// the whole operand field as written
    pub operand_field: Option<Field>,
    pub operands: Vec<Field>,
    pub remarks: String,
    /// first column of the first line through the end of the last line
    pub range: lsp::Range
}

impl Statement {
    /// Position used to identify the statement in a processing frame
    pub fn position(&self) -> lsp::Position {
        match &self.instruction {
            Some(f) => f.range.start,
            None => self.range.start
        }
    }
    pub fn label_text(&self) -> &str {
        match &self.label {
            Some(f) => &f.text,
            None => ""
        }
    }
    /// Instruction field in upper case, empty if absent
    pub fn opcode(&self) -> String {
        match &self.instruction {
            Some(f) => f.text.to_uppercase(),
            None => String::new()
        }
    }
    pub fn operand_text(&self) -> &str {
        match &self.operand_field {
            Some(f) => &f.text,
            None => ""
        }
    }
    /// Build a statement from already substituted field texts, keeping the ranges of `model`
    pub fn with_fields(model: &Statement,label: &str,instruction: &str,operands: &str) -> Self {
        let rng = match &model.operand_field {
            Some(f) => f.range,
            None => lsp::Range::new(model.range.end,model.range.end)
        };
        let operand_field = match operands.is_empty() {
            true => None,
            false => Some(Field::new(operands,rng))
        };
        Self {
            label: match (label.is_empty(),&model.label) {
                (true,_) => None,
                (false,Some(f)) => Some(Field::new(label,f.range)),
                (false,None) => Some(Field::new(label,lsp::Range::new(model.range.start,model.range.start)))
            },
            instruction: match (instruction.is_empty(),&model.instruction) {
                (true,_) => None,
                (false,Some(f)) => Some(Field::new(instruction,f.range)),
                (false,None) => Some(Field::new(instruction,lsp::Range::new(model.range.start,model.range.start)))
            },
            operands: split_operands(operands).iter().map(|o| Field::new(o,rng)).collect(),
            operand_field,
            remarks: model.remarks.clone(),
            range: model.range
        }
    }
}

/// True if the line is a comment line
pub fn is_comment(line: &str) -> bool {
    line.starts_with('*') || line.starts_with(".*")
}

/// True if the line is continued on the next one
pub fn is_continued(line: &str) -> bool {
    match line.chars().nth(CONTINUATION_COLUMN) {
        Some(c) => c != ' ',
        None => false
    }
}

/// Is a quote at `i` the apostrophe of an attribute reference such as `L'SYM`
pub fn is_attribute_quote(chars: &[char],i: usize) -> bool {
    if i==0 || i+1 >= chars.len() {
        return false;
    }
    let attr = chars[i-1].to_ascii_uppercase();
    if !"LKNTDIOS".contains(attr) {
        return false;
    }
    if i >= 2 && (chars[i-2].is_ascii_alphanumeric() || "@#$_&".contains(chars[i-2])) {
        return false;
    }
    let next = chars[i+1];
    next.is_ascii_alphabetic() || "@#$_&*=".contains(next)
}

/// Split an operand list at commas that are outside quotes and parentheses
pub fn split_operands(s: &str) -> Vec<String> {
    let mut ans = Vec::new();
    if s.is_empty() {
        return ans;
    }
    let chars: Vec<char> = s.chars().collect();
    let mut depth = 0;
    let mut quoted = false;
    let mut curr = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c=='\'' && !is_attribute_quote(&chars,i) {
            quoted = !quoted;
        } else if !quoted && c=='(' {
            depth += 1;
        } else if !quoted && c==')' && depth > 0 {
            depth -= 1;
        } else if !quoted && depth==0 && c==',' {
            ans.push(curr);
            curr = String::new();
            continue;
        }
        curr.push(c);
    }
    ans.push(curr);
    ans
}

/// Characters of one logical statement, each with its physical position
struct Logical {
    chars: Vec<char>,
    pos: Vec<lsp::Position>,
    /// index in `chars` where each continuation line begins
    breaks: Vec<usize>
}

impl Logical {
    fn range(&self,beg: usize,end: usize) -> lsp::Range {
        let start = self.pos[beg];
        let last = self.pos[end-1];
        lsp::Range::new(start,lsp::Position::new(last.line,last.character+1))
    }
    fn text(&self,beg: usize,end: usize) -> String {
        self.chars[beg..end].iter().collect()
    }
    fn field(&self,beg: usize,end: usize) -> Field {
        Field { text: self.text(beg,end), range: self.range(beg,end) }
    }
    fn next_break(&self,i: usize) -> Option<usize> {
        self.breaks.iter().find(|b| **b > i).copied()
    }
}

fn split_logical(lg: &Logical,range: lsp::Range) -> Statement {
    let n = lg.chars.len();
    let mut i = 0;
    let mut label = None;
    if n > 0 && lg.chars[0] != ' ' {
        while i < n && lg.chars[i] != ' ' {
            i += 1;
        }
        label = Some(lg.field(0,i));
    }
    while i < n && lg.chars[i]==' ' {
        i += 1;
    }
    let mut instruction = None;
    let beg = i;
    while i < n && lg.chars[i] != ' ' {
        i += 1;
    }
    if i > beg {
        instruction = Some(lg.field(beg,i));
    }
    while i < n && lg.chars[i]==' ' {
        i += 1;
    }
    // operands end at the first blank outside quotes and parentheses, unless a comma
    // precedes it and a continuation line follows, in which case they resume on that line
    let mut operands = Vec::new();
    let mut operand_text = String::new();
    let mut operand_range: Option<lsp::Range> = None;
    let mut depth = 0;
    let mut quoted = false;
    let mut op_beg = i;
    let mut curr_beg = i;
    while i < n {
        let c = lg.chars[i];
        if c==' ' && !quoted && depth==0 {
            if i > 0 && lg.chars[i-1]==',' {
                if let Some(b) = lg.next_break(i) {
                    if op_beg < i {
                        let r = lg.range(op_beg,i);
                        operand_range = Some(match operand_range { Some(o) => lsp::Range::new(o.start,r.end), None => r });
                    }
                    i = b;
                    while i < n && lg.chars[i]==' ' {
                        i += 1;
                    }
                    op_beg = i;
                    curr_beg = i;
                    continue;
                }
            }
            break;
        }
        if c=='\'' && !is_attribute_quote(&lg.chars,i) {
            quoted = !quoted;
        } else if !quoted && c=='(' {
            depth += 1;
        } else if !quoted && c==')' && depth > 0 {
            depth -= 1;
        } else if !quoted && depth==0 && c==',' {
            if curr_beg < i {
                operands.push(lg.field(curr_beg,i));
            } else {
                operands.push(Field::new("",lg.range(i,i+1)));
            }
            operand_text.push(c);
            i += 1;
            curr_beg = i;
            continue;
        }
        operand_text.push(c);
        i += 1;
    }
    if op_beg < i {
        let r = lg.range(op_beg,i);
        operand_range = Some(match operand_range { Some(o) => lsp::Range::new(o.start,r.end), None => r });
    }
    if curr_beg < i {
        operands.push(lg.field(curr_beg,i));
    } else if !operand_text.is_empty() {
        operands.push(Field::new("",lg.range(i-1,i)));
    }
    let remarks: String = lg.chars[i.min(n)..].iter().collect();
    Statement {
        label,
        instruction,
        operand_field: operand_range.map(|r| Field::new(&operand_text,r)),
        operands,
        remarks: remarks.trim().to_string(),
        range
    }
}

/// Split fixed-format source into statements.
/// Comment lines and blank lines produce no statement.
pub fn parse_source(text: &str) -> Vec<Statement> {
    let lines: Vec<&str> = text.lines().collect();
    let mut ans = Vec::new();
    let mut row = 0;
    while row < lines.len() {
        let first = lines[row];
        if is_comment(first) || first.trim().is_empty() {
            row += 1;
            continue;
        }
        let mut lg = Logical { chars: Vec::new(), pos: Vec::new(), breaks: Vec::new() };
        let start_row = row;
        loop {
            let line: Vec<char> = lines[row].chars().collect();
            let beg = if row==start_row { 0 } else { CONTINUE_COLUMN };
            if row > start_row {
                lg.breaks.push(lg.chars.len());
            }
            for col in beg..line.len().min(CONTINUATION_COLUMN) {
                lg.chars.push(line[col]);
                lg.pos.push(lsp::Position::new(row as u32,col as u32));
            }
            if is_continued(lines[row]) && row+1 < lines.len() {
                row += 1;
            } else {
                break;
            }
        }
        let end_len = lines[row].chars().count() as u32;
        let range = lsp::Range::new(lsp::Position::new(start_row as u32,0),lsp::Position::new(row as u32,end_len));
        ans.push(split_logical(&lg,range));
        row += 1;
    }
    ans
}
