//! Identifier interner.
//!
//! Every symbol name handled by the context is interned once.  Handles compare
//! and hash by address, so equal handles always come from the same storage.

use std::collections::HashSet;
use std::hash::{Hash,Hasher};
use std::rc::Rc;

#[derive(Clone)]
pub struct Id(Rc<str>);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for Id {
    fn eq(&self,other: &Self) -> bool {
        Rc::ptr_eq(&self.0,&other.0)
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self,state: &mut H) {
        (Rc::as_ptr(&self.0) as *const u8 as usize).hash(state);
    }
}

impl std::ops::Deref for Id {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self,f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,"{}",&self.0)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self,f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,"Id({:?})",&self.0)
    }
}

pub struct IdStorage {
    lit: HashSet<Rc<str>>,
    empty: Id
}

impl IdStorage {
    pub fn new() -> Self {
        let empty: Rc<str> = Rc::from("");
        let mut lit = HashSet::new();
        lit.insert(Rc::clone(&empty));
        Self {
            lit,
            empty: Id(empty)
        }
    }
    /// Intern `s`, repeated calls with equal content return the same handle
    pub fn add(&mut self,s: &str) -> Id {
        if let Some(rc) = self.lit.get(s) {
            return Id(Rc::clone(rc));
        }
        let rc: Rc<str> = Rc::from(s);
        self.lit.insert(Rc::clone(&rc));
        Id(rc)
    }
    /// Look up `s` without interning it
    pub fn find(&self,s: &str) -> Option<Id> {
        self.lit.get(s).map(|rc| Id(Rc::clone(rc)))
    }
    pub fn empty_id(&self) -> Id {
        self.empty.clone()
    }
    pub fn len(&self) -> usize {
        self.lit.len()
    }
}
