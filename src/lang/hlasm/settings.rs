//! Parse settings string sent by any client.
//!
//! Keys are looked for under a top level `hlasm` object.  Unknown keys are
//! ignored and values of the wrong type leave the default in place.

use serde_json;
use crate::DYNERR;
use crate::lang::{update_json_bool,update_json_i64,update_json_string,update_json_vec_str};

#[derive(Clone)]
pub struct Hovers {
    pub instructions: bool
}
#[derive(Clone)]
pub struct Completions {
    pub lower_case: bool
}
#[derive(Clone)]
pub struct Settings {
    /// value of `&SYSPARM`
    pub sysparm: String,
    /// value of `&SYSOPT_RENT`
    pub rent: bool,
    /// deepest macro nesting the analyzer will expand
    pub max_nesting: i64,
    /// initial branch counter of every scope
    pub actr: i64,
    /// directories searched for macros and copy members
    pub library: Vec<String>,
    pub hovers: Hovers,
    pub completions: Completions
}

impl Settings {
    pub fn new() -> Self {
        Self {
            sysparm: String::new(),
            rent: false,
            max_nesting: 100,
            actr: 4096,
            library: Vec::new(),
            hovers: Hovers {
                instructions: true
            },
            completions: Completions {
                lower_case: false
            }
        }
    }
}

pub fn parse(json: &str) -> Result<Settings,DYNERR> {
    let mut ans = Settings::new();
    if let Ok(root) = serde_json::from_str::<serde_json::Value>(json) {
        if let Some(outer) = root.as_object() {
            if let Some(hlasm) = outer.get("hlasm") {
                update_json_string(hlasm,"sysparm",&mut ans.sysparm);
                update_json_bool(hlasm,"rent",&mut ans.rent);
                update_json_i64(hlasm,"maxNesting",&mut ans.max_nesting);
                update_json_i64(hlasm,"actr",&mut ans.actr);
                update_json_vec_str(hlasm,"library",&mut ans.library);
                if let Some(val) = hlasm.get("hovers") {
                    update_json_bool(val,"instructions",&mut ans.hovers.instructions);
                }
                if let Some(val) = hlasm.get("completions") {
                    update_json_bool(val,"lowerCase",&mut ans.completions.lower_case);
                }
            }
        }
        if ans.max_nesting < 1 || ans.actr < 0 {
            return Err(Box::new(crate::lang::Error::BadSettings));
        }
        Ok(ans)
    } else {
        Err(Box::new(crate::lang::Error::BadSettings))
    }
}
