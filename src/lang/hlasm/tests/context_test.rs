//! Test of the context engine: scopes, variables, system variables, mnemonics.

use std::collections::HashMap;
use std::rc::Rc;
use lsp_types as lsp;
use super::super::context::HlasmContext;
use super::super::settings::Settings;
use super::super::macros::{CopyNestItem,MacroArg,MacroDefinition,MacroParamDef,SequenceSymbol};
use super::super::variables::{MacroData,SetType,SetValue};
use super::super::ordinary::{SectionKind,SymbolAttributes,SymbolOrigin,SymbolValue,RelocValue};
use super::super::statement;
use super::super::{DataAttrKind,Error,Location};

const OPENCODE: &str = "file:///src/prog.hlasm";
const MACFILE: &str = "file:///maclib/mac.hlasm";

fn test_helper(settings: &Settings) -> HlasmContext {
    let now = chrono::NaiveDate::from_ymd_opt(2024,3,9)
        .and_then(|d| d.and_hms_opt(14,5,0))
        .expect("bad date");
    HlasmContext::new_at(OPENCODE,settings,now)
}

/// Register a macro whose body is `body`, parameters given as `&P` or `&K=default`
fn define(ctx: &mut HlasmContext,name: &str,params: &[&str],body: &str) -> Rc<MacroDefinition> {
    let stmts = statement::parse_source(body);
    let copy_nests = stmts.iter().map(|s| vec![CopyNestItem {
        loc: Location::new(MACFILE,s.position()),
        member: None
    }]).collect();
    let mut param_defs = Vec::new();
    for p in params {
        let p = p.trim_start_matches('&');
        let (n,d) = match p.find('=') {
            Some(eq) => (&p[0..eq],Some(MacroData::from_operand(&p[eq+1..]))),
            None => (p,None)
        };
        param_defs.push(MacroParamDef { id: ctx.add_id(n), default: d });
    }
    let def = MacroDefinition {
        id: ctx.add_id(name),
        label_param: None,
        params: param_defs,
        body: stmts,
        copy_nests,
        labels: HashMap::new(),
        definition_location: Location::new(MACFILE,lsp::Position::new(1,9))
    };
    ctx.add_macro(def)
}

fn value_of(ctx: &mut HlasmContext,name: &str,offset: &[usize]) -> String {
    let id = ctx.add_id(name);
    match ctx.get_var_sym(&id) {
        Some(v) => v.borrow().get_value(offset).to_c(),
        None => panic!("{} is not visible",name)
    }
}

fn positional(s: &str) -> MacroArg {
    MacroArg { keyword: None, data: MacroData::from_operand(s) }
}

mod scopes {
    use super::super::super::settings::Settings;
    use super::super::super::Error;
    #[test]
    fn open_code_only() {
        let mut ctx = super::test_helper(&Settings::new());
        assert_eq!(ctx.scope_stack().len(),1);
        assert!(!ctx.is_in_macro());
        assert!(ctx.this_macro().is_none());
        assert_eq!(ctx.leave_macro(),Err(Error::OpenCodeExit));
        assert_eq!(ctx.opencode_file_name(),super::OPENCODE);
        assert!(ctx.visited_files().contains(super::OPENCODE));
    }
    #[test]
    fn unknown_macro() {
        let mut ctx = super::test_helper(&Settings::new());
        let id = ctx.add_id("NOPE");
        assert_eq!(ctx.enter_macro(&id,None,vec![]).err(),Some(Error::UnknownMacro("NOPE".to_string())));
        assert_eq!(ctx.scope_stack().len(),1);
    }
    #[test]
    fn enter_and_leave() {
        let mut ctx = super::test_helper(&Settings::new());
        let def = super::define(&mut ctx,"M",&[],"         LR    1,2\n         MEND\n");
        let invo = ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        assert!(ctx.is_in_macro());
        assert_eq!(invo.borrow().id,def.id);
        assert!(ctx.this_macro().is_some());
        assert!(ctx.visited_files().contains(super::MACFILE));
        ctx.leave_macro().expect("leave failed");
        assert!(!ctx.is_in_macro());
    }
    #[test]
    fn redefinition_replaces() {
        let mut ctx = super::test_helper(&Settings::new());
        let first = super::define(&mut ctx,"M",&[],"         MEND\n");
        let second = super::define(&mut ctx,"M",&["&P"],"         MEND\n");
        let found = ctx.get_macro_definition(&first.id).expect("macro missing");
        assert!(std::rc::Rc::ptr_eq(&found,&second));
        assert_eq!(ctx.macros().len(),1);
    }
}

mod system_variables {
    use super::super::super::settings::Settings;
    #[test]
    fn date_and_time() {
        let mut ctx = super::test_helper(&Settings::new());
        assert_eq!(super::value_of(&mut ctx,"SYSDATC",&[]),"20240309");
        assert_eq!(super::value_of(&mut ctx,"SYSDATE",&[]),"03/09/24");
        assert_eq!(super::value_of(&mut ctx,"SYSTIME",&[]),"14:05");
    }
    #[test]
    fn globals_are_writable_and_shared() {
        let mut ctx = super::test_helper(&Settings::new());
        let id = ctx.add_id("SYSDATE");
        let outer = ctx.get_var_sym(&id).expect("SYSDATE missing");
        assert!(outer.borrow_mut().set(None,super::SetValue::C("12/31/99".to_string())));
        let def = super::define(&mut ctx,"M",&[],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        let inner = ctx.get_var_sym(&id).expect("SYSDATE missing in macro");
        assert!(super::Rc::ptr_eq(&outer,&inner));
        assert_eq!(super::value_of(&mut ctx,"SYSDATE",&[]),"12/31/99");
        for name in ["SYSDATC","SYSTIME","SYSPARM","SYSOPT_RENT"] {
            let id = ctx.add_id(name);
            let inner = ctx.get_var_sym(&id).expect("global missing in macro");
            assert!(super::Rc::ptr_eq(&inner,&ctx.global_system_vars()[&id]),"{}",name);
        }
    }
    #[test]
    fn sysparm_and_rent() {
        let mut settings = Settings::new();
        settings.sysparm = "DEBUG".to_string();
        settings.rent = true;
        let mut ctx = super::test_helper(&settings);
        assert_eq!(super::value_of(&mut ctx,"SYSPARM",&[]),"DEBUG");
        assert_eq!(super::value_of(&mut ctx,"SYSOPT_RENT",&[]),"1");
    }
    #[test]
    fn sysndx_counts_calls() {
        let mut ctx = super::test_helper(&Settings::new());
        let def = super::define(&mut ctx,"M",&[],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        assert_eq!(super::value_of(&mut ctx,"SYSNDX",&[]),"0");
        ctx.leave_macro().expect("leave failed");
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        let id = ctx.add_id("SYSNDX");
        let var = ctx.get_var_sym(&id).expect("SYSNDX missing");
        assert_eq!(var.borrow().get_value(&[]),super::SetValue::A(1));
        assert_eq!(ctx.get_attribute_value_var(super::DataAttrKind::K,Some(&var),&[]),super::SetValue::A(1));
        assert_eq!(ctx.get_type_attr(Some(&var),&[]),"N");
        ctx.leave_macro().expect("leave failed");
        assert_eq!(ctx.sysndx(),2);
    }
    #[test]
    fn sysnest_and_sysmac() {
        let mut ctx = super::test_helper(&Settings::new());
        let outer = super::define(&mut ctx,"OUTER",&[],"         INNER\n         MEND\n");
        let inner = super::define(&mut ctx,"INNER",&[],"         MEND\n");
        ctx.enter_macro(&outer.id,None,vec![]).expect("enter failed");
        assert_eq!(super::value_of(&mut ctx,"SYSNEST",&[]),"1");
        ctx.enter_macro(&inner.id,None,vec![]).expect("enter failed");
        let id = ctx.add_id("SYSNEST");
        assert_eq!(ctx.get_var_sym(&id).expect("SYSNEST missing").borrow().get_value(&[]),super::SetValue::A(2));
        let sysmac = ctx.add_id("SYSMAC");
        assert!(ctx.current_scope().system_variables.contains_key(&sysmac));
        assert_eq!(ctx.current_scope().system_variables.len(),1);
        assert_eq!(super::value_of(&mut ctx,"SYSMAC",&[0]),"INNER");
        assert_eq!(super::value_of(&mut ctx,"SYSMAC",&[1]),"OUTER");
        assert_eq!(super::value_of(&mut ctx,"SYSMAC",&[2]),"OPEN CODE");
        ctx.leave_macro().expect("leave failed");
        assert_eq!(super::value_of(&mut ctx,"SYSNEST",&[]),"1");
    }
    #[test]
    fn section_variables() {
        let mut ctx = super::test_helper(&Settings::new());
        let name = ctx.add_id("PROG");
        let loc = super::Location::new(super::OPENCODE,super::lsp::Position::new(0,9));
        let stack = ctx.processing_stack();
        ctx.ord_ctx.set_section(name,super::SectionKind::Dummy,loc,stack);
        let def = super::define(&mut ctx,"M",&[],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        assert_eq!(super::value_of(&mut ctx,"SYSECT",&[]),"PROG");
        assert_eq!(super::value_of(&mut ctx,"SYSSTYP",&[]),"DSECT");
        assert_eq!(super::value_of(&mut ctx,"SYSLOC",&[]),"PROG");
        let id = ctx.add_id("SYSECT");
        let var = ctx.get_var_sym(&id).expect("SYSECT missing");
        assert!(ctx.current_scope().variables.contains_key(&id));
        assert!(var.borrow_mut().set(None,super::SetValue::C("OTHER".to_string())));
        assert_eq!(super::value_of(&mut ctx,"SYSECT",&[]),"OTHER");
    }
}

mod variables {
    use super::super::super::settings::Settings;
    use super::{SetType,SetValue};
    #[test]
    fn local_scalar() {
        let mut ctx = super::test_helper(&Settings::new());
        let id = ctx.add_id("X");
        let var = ctx.create_local_variable(id.clone(),SetType::A,true);
        assert!(var.borrow_mut().set(None,SetValue::A(7)));
        assert_eq!(ctx.get_var_sym(&id).expect("missing").borrow().get_value(&[]),SetValue::A(7));
    }
    #[test]
    fn local_array() {
        let mut ctx = super::test_helper(&Settings::new());
        let id = ctx.add_id("ARR");
        let var = ctx.create_local_variable(id.clone(),SetType::C,false);
        var.borrow_mut().set(Some(3),SetValue::C("Z".to_string()));
        assert_eq!(super::value_of(&mut ctx,"ARR",&[3]),"Z");
        assert_eq!(super::value_of(&mut ctx,"ARR",&[1]),"");
        assert_eq!(var.borrow().number(&[]),3);
    }
    #[test]
    fn locals_are_per_scope() {
        let mut ctx = super::test_helper(&Settings::new());
        let id = ctx.add_id("X");
        ctx.create_local_variable(id.clone(),SetType::A,true);
        let def = super::define(&mut ctx,"M",&[],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        assert!(ctx.get_var_sym(&id).is_none());
        ctx.leave_macro().expect("leave failed");
        assert!(ctx.get_var_sym(&id).is_some());
    }
    #[test]
    fn globals_share_one_cell() {
        let mut ctx = super::test_helper(&Settings::new());
        let id = ctx.add_id("G");
        let outer = ctx.create_global_variable(id.clone(),SetType::C,true);
        outer.borrow_mut().set(None,SetValue::C("OPEN".to_string()));
        let def = super::define(&mut ctx,"M",&[],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        assert!(ctx.get_var_sym(&id).is_none());
        let inner = ctx.create_global_variable(id.clone(),SetType::C,true);
        assert_eq!(inner.borrow().get_value(&[]),SetValue::C("OPEN".to_string()));
        inner.borrow_mut().set(None,SetValue::C("MACRO".to_string()));
        ctx.leave_macro().expect("leave failed");
        assert_eq!(super::value_of(&mut ctx,"G",&[]),"MACRO");
        assert_eq!(ctx.globals().len(),1);
    }
    #[test]
    fn declaration_is_kept() {
        let mut ctx = super::test_helper(&Settings::new());
        let id = ctx.add_id("X");
        let first = ctx.create_local_variable(id.clone(),SetType::A,true);
        first.borrow_mut().set(None,SetValue::A(1));
        let second = ctx.create_local_variable(id.clone(),SetType::A,true);
        assert_eq!(second.borrow().get_value(&[]),SetValue::A(1));
    }
}

mod parameters {
    use super::super::super::settings::Settings;
    use super::super::super::variables::MacroData;
    use super::MacroArg;
    #[test]
    fn positional_and_keyword() {
        let mut ctx = super::test_helper(&Settings::new());
        let def = super::define(&mut ctx,"M",&["&A","&B","&K=DFLT","&L=(1,2)"],"         MEND\n");
        let k = ctx.add_id("K");
        let args = vec![super::positional("ONE"),MacroArg { keyword: Some(k), data: MacroData::from_operand("NEW") }];
        ctx.enter_macro(&def.id,Some(MacroData::Single("LBL".to_string())),args).expect("enter failed");
        assert_eq!(super::value_of(&mut ctx,"A",&[]),"ONE");
        assert_eq!(super::value_of(&mut ctx,"B",&[]),"");
        assert_eq!(super::value_of(&mut ctx,"K",&[]),"NEW");
        assert_eq!(super::value_of(&mut ctx,"L",&[]),"(1,2)");
        assert_eq!(super::value_of(&mut ctx,"L",&[2]),"2");
        assert_eq!(super::value_of(&mut ctx,"SYSLIST",&[0]),"LBL");
        assert_eq!(super::value_of(&mut ctx,"SYSLIST",&[1]),"ONE");
    }
    #[test]
    fn unknown_keyword_is_positional() {
        let mut ctx = super::test_helper(&Settings::new());
        let def = super::define(&mut ctx,"M",&["&A"],"         MEND\n");
        let z = ctx.add_id("Z");
        let args = vec![MacroArg { keyword: Some(z), data: MacroData::from_operand("9") }];
        ctx.enter_macro(&def.id,None,args).expect("enter failed");
        assert_eq!(super::value_of(&mut ctx,"A",&[]),"Z=9");
    }
    #[test]
    fn sublists() {
        let mut ctx = super::test_helper(&Settings::new());
        let def = super::define(&mut ctx,"M",&["&A"],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![super::positional("(X,(Y,Z))")]).expect("enter failed");
        assert_eq!(super::value_of(&mut ctx,"A",&[2,1]),"Y");
        assert_eq!(super::value_of(&mut ctx,"A",&[5]),"");
        let id = ctx.add_id("A");
        let var = ctx.get_var_sym(&id).expect("missing");
        assert_eq!(var.borrow().number(&[]),2);
        assert_eq!(var.borrow().count(&[1]),1);
        assert!(!var.borrow_mut().set(None,super::SetValue::A(1)));
    }
}

mod mnemonics {
    use super::super::super::settings::Settings;
    use super::super::super::Error;
    #[test]
    fn synonym_of_instruction() {
        let mut ctx = super::test_helper(&Settings::new());
        let (x,lr) = (ctx.add_id("MOVE"),ctx.add_id("LR"));
        ctx.add_mnemonic(x.clone(),lr.clone()).expect("opsyn failed");
        assert_eq!(ctx.get_mnemonic_opcode(&x),lr);
    }
    #[test]
    fn synonym_chain() {
        let mut ctx = super::test_helper(&Settings::new());
        let (x,y,lr) = (ctx.add_id("X1"),ctx.add_id("Y1"),ctx.add_id("LR"));
        ctx.add_mnemonic(x.clone(),lr.clone()).expect("opsyn failed");
        ctx.add_mnemonic(y.clone(),x).expect("opsyn failed");
        assert_eq!(ctx.get_mnemonic_opcode(&y),lr);
    }
    #[test]
    fn synonym_of_macro() {
        let mut ctx = super::test_helper(&Settings::new());
        let def = super::define(&mut ctx,"MYMAC",&[],"         MEND\n");
        let alias = ctx.add_id("ALIAS");
        ctx.add_mnemonic(alias.clone(),def.id.clone()).expect("opsyn failed");
        assert_eq!(ctx.get_mnemonic_opcode(&alias),def.id);
    }
    #[test]
    fn undefined_target() {
        let mut ctx = super::test_helper(&Settings::new());
        let (x,nope) = (ctx.add_id("X1"),ctx.add_id("NOPE"));
        assert_eq!(ctx.add_mnemonic(x,nope),Err(Error::UndefinedOpcode("NOPE".to_string())));
    }
    #[test]
    fn removal() {
        let mut ctx = super::test_helper(&Settings::new());
        let (x,lr) = (ctx.add_id("MOVE"),ctx.add_id("LR"));
        ctx.add_mnemonic(x.clone(),lr.clone()).expect("opsyn failed");
        ctx.remove_mnemonic(lr.clone());
        assert!(ctx.get_mnemonic_opcode(&lr).is_empty());
        assert!(ctx.get_mnemonic_opcode(&x).is_empty());
        let ar = ctx.add_id("AR");
        assert_eq!(ctx.get_mnemonic_opcode(&ar),ar);
    }
}

mod sequence_symbols {
    use super::super::super::settings::Settings;
    use super::super::super::Error;
    use super::{Location,SequenceSymbol};
    #[test]
    fn first_definition_wins() {
        let mut ctx = super::test_helper(&Settings::new());
        let name = ctx.add_id("TOP");
        for line in [3,8] {
            let seq = SequenceSymbol { name: name.clone(), location: Location::new(super::OPENCODE,super::lsp::Position::new(line,0)), statement_offset: line as usize };
            ctx.add_sequence_symbol(seq).expect("add failed");
        }
        assert_eq!(ctx.get_sequence_symbol(&name).expect("missing").statement_offset,3);
    }
    #[test]
    fn not_in_macro() {
        let mut ctx = super::test_helper(&Settings::new());
        let def = super::define(&mut ctx,"M",&[],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        let name = ctx.add_id("TOP");
        let seq = SequenceSymbol { name, location: Location::new(super::OPENCODE,super::lsp::Position::new(0,0)), statement_offset: 0 };
        assert_eq!(ctx.add_sequence_symbol(seq),Err(Error::SequenceSymbolInMacro));
    }
    #[test]
    fn macro_labels() {
        let mut ctx = super::test_helper(&Settings::new());
        let name = ctx.add_id("L1");
        let stmts = super::statement::parse_source(".L1      ANOP\n         MEND\n");
        let mut labels = super::HashMap::new();
        labels.insert(name.clone(),std::rc::Rc::new(SequenceSymbol { name: name.clone(), location: Location::new(super::MACFILE,super::lsp::Position::new(2,0)), statement_offset: 0 }));
        let def = super::MacroDefinition {
            id: ctx.add_id("M"),
            label_param: None,
            params: vec![],
            copy_nests: stmts.iter().map(|_| vec![]).collect(),
            body: stmts,
            labels,
            definition_location: Location::new(super::MACFILE,super::lsp::Position::new(1,9))
        };
        let def = ctx.add_macro(def);
        assert!(ctx.get_sequence_symbol(&name).is_none());
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        assert_eq!(ctx.get_sequence_symbol(&name).expect("missing").location.pos.line,2);
    }
}

mod branch_counter {
    use super::super::super::settings::Settings;
    #[test]
    fn per_scope() {
        let mut settings = Settings::new();
        settings.actr = 10;
        let mut ctx = super::test_helper(&settings);
        assert_eq!(ctx.get_branch_counter(),10);
        ctx.decrement_branch_counter();
        assert_eq!(ctx.get_branch_counter(),9);
        let def = super::define(&mut ctx,"M",&[],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        assert_eq!(ctx.get_branch_counter(),10);
        ctx.set_branch_counter(2);
        assert_eq!(ctx.get_branch_counter(),2);
        assert_eq!(ctx.branch_counter_change(),1);
        ctx.leave_macro().expect("leave failed");
        assert_eq!(ctx.get_branch_counter(),9);
        assert_eq!(ctx.branch_counter_change(),0);
    }
}

mod attributes {
    use super::super::super::settings::Settings;
    use super::*;
    fn define_symbol(ctx: &mut HlasmContext,name: &str,ty: char,len: u32) {
        let id = ctx.add_id(name);
        let stack = ctx.processing_stack();
        let sect = ctx.ord_ctx.align(1);
        ctx.ord_ctx.create_symbol(id,SymbolValue::Reloc(RelocValue { section: sect.section, offset: 0 }),
            SymbolAttributes::new(SymbolOrigin::Dat,ty).with_length(len),
            Location::new(OPENCODE,lsp::Position::new(0,0)),stack);
    }
    #[test]
    fn type_of_set_symbols() {
        let mut ctx = test_helper(&Settings::new());
        define_symbol(&mut ctx,"FLD",'F',4);
        let cases = [("123","N"),("","O"),("FLD","F"),("OTHER","U"),("X'1F'","N")];
        for (val,expected) in cases {
            let id = ctx.add_id("C");
            let var = ctx.create_local_variable(id,SetType::C,true);
            var.borrow_mut().set(None,SetValue::C(val.to_string()));
            assert_eq!(ctx.get_type_attr(Some(&var),&[]),expected,"value {}",val);
        }
        let id = ctx.add_id("A");
        let var = ctx.create_local_variable(id,SetType::A,true);
        assert_eq!(ctx.get_type_attr(Some(&var),&[]),"N");
        assert_eq!(ctx.get_type_attr(None,&[]),"U");
    }
    #[test]
    fn opcode_attribute() {
        let mut ctx = test_helper(&Settings::new());
        define(&mut ctx,"MYMAC",&[],"         MEND\n");
        let cases = [("MYMAC","M"),("LR","O"),("BR","E"),("CSECT","A"),("AIF","A"),("NOPE","U")];
        for (name,expected) in cases {
            let id = ctx.add_id(name);
            assert_eq!(ctx.get_opcode_attr(&id),expected,"opcode {}",name);
        }
    }
    #[test]
    fn symbol_attributes() {
        let mut ctx = test_helper(&Settings::new());
        define_symbol(&mut ctx,"FLD",'F',4);
        let fld = ctx.add_id("FLD");
        let none = ctx.add_id("NONE");
        assert_eq!(ctx.get_attribute_value_symbol(DataAttrKind::L,&fld),SetValue::A(4));
        assert_eq!(ctx.get_attribute_value_symbol(DataAttrKind::D,&fld),SetValue::A(1));
        assert_eq!(ctx.get_attribute_value_symbol(DataAttrKind::T,&fld),SetValue::C("F".to_string()));
        assert_eq!(ctx.get_attribute_value_symbol(DataAttrKind::D,&none),SetValue::A(0));
        assert_eq!(ctx.get_attribute_value_symbol(DataAttrKind::L,&none),SetValue::A(1));
        assert_eq!(ctx.get_attribute_value_symbol(DataAttrKind::T,&none),SetValue::C("U".to_string()));
    }
    #[test]
    fn attributes_through_variables() {
        let mut ctx = test_helper(&Settings::new());
        define_symbol(&mut ctx,"FLD",'F',4);
        let def = define(&mut ctx,"M",&["&P"],"         MEND\n");
        ctx.enter_macro(&def.id,None,vec![positional("FLD")]).expect("enter failed");
        let p = ctx.add_id("P");
        let var = ctx.get_var_sym(&p);
        assert_eq!(ctx.get_attribute_value_var(DataAttrKind::K,var.as_ref(),&[]),SetValue::A(3));
        assert_eq!(ctx.get_attribute_value_var(DataAttrKind::N,var.as_ref(),&[]),SetValue::A(1));
        assert_eq!(ctx.get_attribute_value_var(DataAttrKind::L,var.as_ref(),&[]),SetValue::A(4));
        assert_eq!(ctx.get_attribute_value_var(DataAttrKind::T,var.as_ref(),&[]),SetValue::C("F".to_string()));
    }
    #[test]
    fn undefined_variable() {
        let ctx = test_helper(&Settings::new());
        assert_eq!(ctx.get_attribute_value_var(DataAttrKind::K,None,&[]),SetValue::A(0));
        assert_eq!(ctx.get_attribute_value_var(DataAttrKind::N,None,&[]),SetValue::A(0));
        assert_eq!(ctx.get_attribute_value_var(DataAttrKind::T,None,&[]),SetValue::C("U".to_string()));
    }
}

mod processing {
    use super::super::super::settings::Settings;
    use super::super::super::processing::ProcessingKind;
    use super::Error;
    #[test]
    fn initial_stack() {
        let ctx = super::test_helper(&Settings::new());
        let stack = ctx.processing_stack();
        assert_eq!(stack.len(),1);
        assert_eq!(stack[0].proc_location.file,super::OPENCODE);
        assert_eq!(ctx.processing_kind(),ProcessingKind::Ordinary);
    }
    #[test]
    fn underflow() {
        let mut ctx = super::test_helper(&Settings::new());
        assert_eq!(ctx.pop_statement_processing(),Err(Error::ProcessingUnderflow));
    }
    #[test]
    fn lookahead_shares_source() {
        let mut ctx = super::test_helper(&Settings::new());
        ctx.push_statement_processing(ProcessingKind::Lookahead);
        assert_eq!(ctx.processing_kind(),ProcessingKind::Lookahead);
        assert_eq!(ctx.source_stack().len(),1);
        ctx.pop_statement_processing().expect("pop failed");
        ctx.push_statement_processing_with_source(ProcessingKind::MacroDefinition,super::MACFILE);
        assert_eq!(ctx.source_stack().len(),2);
        assert_eq!(ctx.processing_stack().len(),2);
        ctx.pop_statement_processing().expect("pop failed");
        assert_eq!(ctx.source_stack().len(),1);
    }
    #[test]
    fn stack_through_macro() {
        let mut ctx = super::test_helper(&Settings::new());
        ctx.set_source_position(super::lsp::Position::new(4,9));
        let def = super::define(&mut ctx,"M",&[],"         LR    1,2\n         MEND\n");
        let invo = ctx.enter_macro(&def.id,None,vec![]).expect("enter failed");
        invo.borrow_mut().current_statement = 1;
        let stack = ctx.processing_stack();
        assert_eq!(stack.len(),2);
        assert_eq!(stack[0].proc_location.pos,super::lsp::Position::new(4,9));
        assert_eq!(stack[1].proc_location.file,super::MACFILE);
        assert_eq!(stack[1].proc_location.pos,super::lsp::Position::new(1,9));
        assert_eq!(stack[1].member_name.as_ref().map(|m| m.to_string()),Some("M".to_string()));
    }
}
