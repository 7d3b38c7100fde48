//! # Conditional assembly expressions
//!
//! A small recursive descent evaluator for the operands of SETA, SETB, SETC, AIF
//! and ACTR, and the substitution of variable symbols into model statements.
//!
//! Arithmetic is 32 bit with wrapping.  Character comparison orders by length first,
//! then by content.  Ordinary symbols used as terms contribute their absolute value,
//! anything the evaluator cannot make sense of contributes zero.

use super::super::context::HlasmContext;
use super::super::ordinary::SymbolValue;
use super::super::statement::is_attribute_quote;
use super::super::terms;
use super::super::variables::{SetValue,VariableKind,VarSymPtr};
use super::super::DataAttrKind;

pub fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || "@#$_".contains(c)
}

pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "@#$_".contains(c)
}

pub fn to_arith(v: &SetValue) -> i32 {
    match v {
        SetValue::A(a) => *a,
        SetValue::B(b) => *b as i32,
        SetValue::C(c) => terms::self_defining_term(c).unwrap_or(0)
    }
}

pub fn to_bool(v: &SetValue) -> bool {
    match v {
        SetValue::A(a) => *a != 0,
        SetValue::B(b) => *b,
        SetValue::C(c) => c=="1"
    }
}

/// Does a `(` after the variable start a subscript
fn takes_subscript(var: &VarSymPtr) -> bool {
    let var = var.borrow();
    match &var.kind {
        VariableKind::Set(s) => !s.is_scalar,
        VariableKind::SysList { .. } => true,
        _ => match var.get_data(&[]) {
            Some(d) => d.is_composite(),
            None => false
        }
    }
}

pub struct Evaluator<'a> {
    ctx: &'a HlasmContext,
    chars: Vec<char>,
    pos: usize
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a HlasmContext,text: &str) -> Self {
        Self { ctx, chars: text.chars().collect(), pos: 0 }
    }
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }
    fn peek_at(&self,ahead: usize) -> Option<char> {
        self.chars.get(self.pos+ahead).copied()
    }
    fn skip_ws(&mut self) {
        while self.peek()==Some(' ') {
            self.pos += 1;
        }
    }
    fn eat(&mut self,c: char) -> bool {
        self.skip_ws();
        if self.peek()==Some(c) {
            self.pos += 1;
            return true;
        }
        false
    }
    /// Match a keyword operator such as `EQ` or `AND`, which must stand alone
    fn eat_keyword(&mut self,kw: &str) -> bool {
        self.skip_ws();
        let n = kw.len();
        if self.pos + n > self.chars.len() {
            return false;
        }
        let word: String = self.chars[self.pos..self.pos+n].iter().collect();
        if !word.eq_ignore_ascii_case(kw) {
            return false;
        }
        if let Some(c) = self.peek_at(n) {
            if is_name_char(c) {
                return false;
            }
        }
        self.pos += n;
        true
    }
    fn name(&mut self) -> String {
        let mut ans = String::new();
        while let Some(c) = self.peek() {
            if !is_name_char(c) {
                break;
            }
            ans.push(c.to_ascii_uppercase());
            self.pos += 1;
        }
        ans
    }
    /// Parse `&NAME` with optional subscripts, the cursor is on the ampersand
    pub fn var_ref(&mut self) -> (Option<VarSymPtr>,Vec<usize>) {
        self.pos += 1;
        let name = self.name();
        let var = self.ctx.ids().find(&name).and_then(|id| self.ctx.get_var_sym(&id));
        let mut offset = Vec::new();
        let subscripted = match &var {
            Some(v) => takes_subscript(v),
            None => false
        };
        if subscripted && self.peek()==Some('(') {
            self.pos += 1;
            loop {
                let v = self.expr();
                offset.push(to_arith(&v).max(0) as usize);
                if !self.eat(',') {
                    break;
                }
            }
            self.eat(')');
        }
        (var,offset)
    }
    pub fn expr(&mut self) -> SetValue {
        let mut lhs = self.and_expr();
        loop {
            if self.eat_keyword("OR") {
                let rhs = self.and_expr();
                lhs = SetValue::B(to_bool(&lhs) || to_bool(&rhs));
            } else if self.eat_keyword("XOR") {
                let rhs = self.and_expr();
                lhs = SetValue::B(to_bool(&lhs) != to_bool(&rhs));
            } else {
                return lhs;
            }
        }
    }
    fn and_expr(&mut self) -> SetValue {
        let mut lhs = self.not_expr();
        while self.eat_keyword("AND") {
            let rhs = self.not_expr();
            lhs = SetValue::B(to_bool(&lhs) && to_bool(&rhs));
        }
        lhs
    }
    fn not_expr(&mut self) -> SetValue {
        if self.eat_keyword("NOT") {
            let v = self.not_expr();
            return SetValue::B(!to_bool(&v));
        }
        self.relation()
    }
    fn relation(&mut self) -> SetValue {
        let lhs = self.arith();
        for op in ["EQ","NE","LE","LT","GE","GT"] {
            if self.eat_keyword(op) {
                let rhs = self.arith();
                let ord = match (&lhs,&rhs) {
                    (SetValue::C(a),SetValue::C(b)) => (a.chars().count(),a).cmp(&(b.chars().count(),b)),
                    _ => to_arith(&lhs).cmp(&to_arith(&rhs))
                };
                let ans = match op {
                    "EQ" => ord.is_eq(),
                    "NE" => ord.is_ne(),
                    "LE" => ord.is_le(),
                    "LT" => ord.is_lt(),
                    "GE" => ord.is_ge(),
                    _ => ord.is_gt()
                };
                return SetValue::B(ans);
            }
        }
        lhs
    }
    fn arith(&mut self) -> SetValue {
        let mut lhs = self.term();
        loop {
            if self.eat('+') {
                let rhs = self.term();
                lhs = SetValue::A(to_arith(&lhs).wrapping_add(to_arith(&rhs)));
            } else if self.eat('-') {
                let rhs = self.term();
                lhs = SetValue::A(to_arith(&lhs).wrapping_sub(to_arith(&rhs)));
            } else {
                return lhs;
            }
        }
    }
    fn term(&mut self) -> SetValue {
        let mut lhs = self.unary();
        loop {
            if self.eat('*') {
                let rhs = self.unary();
                lhs = SetValue::A(to_arith(&lhs).wrapping_mul(to_arith(&rhs)));
            } else if self.eat('/') {
                let rhs = to_arith(&self.unary());
                // division by zero yields zero
                lhs = SetValue::A(match rhs {
                    0 => 0,
                    d => to_arith(&lhs).wrapping_div(d)
                });
            } else {
                return lhs;
            }
        }
    }
    fn unary(&mut self) -> SetValue {
        if self.eat('-') {
            let v = self.unary();
            return SetValue::A(to_arith(&v).wrapping_neg());
        }
        if self.eat('+') {
            let v = self.unary();
            return SetValue::A(to_arith(&v));
        }
        self.primary()
    }
    fn primary(&mut self) -> SetValue {
        self.skip_ws();
        let c = match self.peek() {
            Some(c) => c,
            None => return SetValue::A(0)
        };
        if c=='(' {
            self.pos += 1;
            let v = self.expr();
            self.eat(')');
            return v;
        }
        if c=='\'' {
            return self.string();
        }
        if c=='&' {
            let (var,offset) = self.var_ref();
            return match var {
                Some(v) => v.borrow().get_value(&offset),
                None => SetValue::C(String::new())
            };
        }
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(d) = self.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                self.pos += 1;
            }
            return SetValue::A(terms::self_defining_term(&digits).unwrap_or(0));
        }
        if is_name_start(c) && self.peek_at(1)==Some('\'') {
            if let Some(attr) = DataAttrKind::from_char(c) {
                if self.peek_at(2).map_or(false,|n| n=='&' || is_name_start(n)) {
                    self.pos += 2;
                    return self.attribute(attr);
                }
            }
            if "XBCxbc".contains(c) {
                return self.quoted_term();
            }
        }
        if is_name_start(c) {
            let name = self.name();
            let value = self.ctx.ids().find(&name)
                .and_then(|id| self.ctx.ord_ctx.get_symbol(&id).map(|s| s.value));
            return match value {
                Some(SymbolValue::Abs(v)) => SetValue::A(v),
                _ => SetValue::A(0)
            };
        }
        log::debug!("unexpected {} in expression",c);
        self.pos += 1;
        SetValue::A(0)
    }
    /// `X'..'`, `B'..'` or `C'..'`
    fn quoted_term(&mut self) -> SetValue {
        let beg = self.pos;
        self.pos += 2;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c=='\'' {
                if self.peek()==Some('\'') {
                    self.pos += 1;
                    continue;
                }
                break;
            }
        }
        let text: String = self.chars[beg..self.pos].iter().collect();
        SetValue::A(terms::self_defining_term(&text).unwrap_or(0))
    }
    fn attribute(&mut self,attr: DataAttrKind) -> SetValue {
        if self.peek()==Some('&') {
            let (var,offset) = self.var_ref();
            return self.ctx.get_attribute_value_var(attr,var.as_ref(),&offset);
        }
        let name = self.name();
        match self.ctx.ids().find(&name) {
            Some(id) => self.ctx.get_attribute_value_symbol(attr,&id),
            None => self.ctx.get_attribute_value_symbol(attr,&self.ctx.ids().empty_id())
        }
    }
    /// Quoted character expression with substitution, optional substring and concatenation
    fn string(&mut self) -> SetValue {
        let mut ans = String::new();
        loop {
            let mut part = String::new();
            self.pos += 1;
            while let Some(c) = self.peek() {
                if c=='\'' {
                    if self.peek_at(1)==Some('\'') {
                        part.push('\'');
                        self.pos += 2;
                        continue;
                    }
                    self.pos += 1;
                    break;
                }
                if c=='&' {
                    if self.peek_at(1)==Some('&') {
                        part.push('&');
                        self.pos += 2;
                        continue;
                    }
                    let (var,offset) = self.var_ref();
                    if let Some(v) = var {
                        part += &v.borrow().get_value(&offset).to_c();
                    }
                    if self.peek()==Some('.') {
                        self.pos += 1;
                    }
                    continue;
                }
                part.push(c);
                self.pos += 1;
            }
            if self.peek()==Some('(') {
                self.pos += 1;
                let start = to_arith(&self.expr()).max(1) as usize;
                self.eat(',');
                self.skip_ws();
                let len = match self.peek() {
                    Some('*') => {
                        self.pos += 1;
                        usize::MAX
                    },
                    _ => to_arith(&self.expr()).max(0) as usize
                };
                self.eat(')');
                part = part.chars().skip(start-1).take(len).collect();
            }
            ans += &part;
            if self.peek()==Some('.') && self.peek_at(1)==Some('\'') {
                self.pos += 1;
                continue;
            }
            return SetValue::C(ans);
        }
    }
}

/// Evaluate a conditional assembly operand
pub fn evaluate(ctx: &HlasmContext,text: &str) -> SetValue {
    let mut ev = Evaluator::new(ctx,text);
    ev.expr()
}

/// Replace variable symbols in a model statement field by their values.
/// A period right after a variable symbol is consumed, `&&` is kept as written,
/// and unknown variables are left in place.
pub fn substitute(ctx: &HlasmContext,text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut ev = Evaluator::new(ctx,text);
    let mut ans = String::new();
    while let Some(c) = ev.peek() {
        if c=='&' {
            if ev.peek_at(1)==Some('&') {
                ans += "&&";
                ev.pos += 2;
                continue;
            }
            if ev.peek_at(1).map_or(false,is_name_start) {
                let beg = ev.pos;
                let (var,offset) = ev.var_ref();
                match var {
                    Some(v) => {
                        ans += &v.borrow().get_value(&offset).to_c();
                        if ev.peek()==Some('.') {
                            ev.pos += 1;
                        }
                    },
                    None => ans.extend(ev.chars[beg..ev.pos].iter())
                }
                continue;
            }
        }
        ans.push(c);
        ev.pos += 1;
    }
    ans
}

/// Split `&NAME(subscript)` into the upper case name and the subscript text
pub fn split_var_name(text: &str) -> Option<(String,Option<String>)> {
    let rest = text.strip_prefix('&')?;
    let end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
    if end==0 {
        return None;
    }
    let name = rest[0..end].to_uppercase();
    let tail = &rest[end..];
    if tail.starts_with('(') && tail.ends_with(')') {
        return Some((name,Some(tail[1..tail.len()-1].to_string())));
    }
    Some((name,None))
}

/// Split an AIF operand `(condition).TARGET` at the closing parenthesis
pub fn split_conditional_branch(text: &str) -> Option<(String,String)> {
    let chars: Vec<char> = text.chars().collect();
    if chars.first() != Some(&'(') {
        return None;
    }
    let mut depth = 0;
    let mut quoted = false;
    for (i,c) in chars.iter().enumerate() {
        match c {
            '\'' if !is_attribute_quote(&chars,i) => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth==0 {
                    let cond: String = chars[0..=i].iter().collect();
                    let target: String = chars[i+1..].iter().collect();
                    let target = target.strip_prefix('.')?.to_uppercase();
                    return Some((cond,target));
                }
            },
            _ => {}
        }
    }
    None
}
