//! Test of copy member cursors and source snapshots.

use lsp_types as lsp;
use super::super::context::HlasmContext;
use super::super::settings::Settings;
use super::super::statement;
use super::super::Location;

const OPENCODE: &str = "file:///src/prog.hlasm";
const COPYFILE: &str = "file:///maclib/regs.hlasm";

fn test_helper() -> HlasmContext {
    let mut ctx = HlasmContext::new(OPENCODE,&Settings::new());
    let body = statement::parse_source("R0       EQU   0\nR1       EQU   1\nR2       EQU   2\n");
    let name = ctx.add_id("REGS");
    ctx.add_copy_member(name,body,Location::new(COPYFILE,lsp::Position::new(0,0)));
    ctx
}

mod cursors {
    use super::super::super::Error;
    use super::super::super::processing::FileProcessingType;
    #[test]
    fn enter_and_leave() {
        let mut ctx = super::test_helper();
        let name = ctx.add_id("REGS");
        ctx.enter_copy_member(&name).expect("enter failed");
        assert_eq!(ctx.current_copy_stack().len(),1);
        assert_eq!(ctx.whole_copy_stack(),vec![name.clone()]);
        ctx.current_copy_stack_mut()[0].current_statement = 2;
        let stack = ctx.processing_stack();
        assert_eq!(stack.len(),2);
        assert_eq!(stack[1].proc_type,FileProcessingType::Copy);
        assert_eq!(stack[1].proc_location.file,super::COPYFILE);
        assert_eq!(stack[1].proc_location.pos.line,2);
        ctx.leave_copy_member().expect("leave failed");
        assert!(ctx.current_copy_stack().is_empty());
        assert_eq!(ctx.leave_copy_member(),Err(Error::CopyUnderflow));
    }
    #[test]
    fn unknown_member() {
        let mut ctx = super::test_helper();
        let name = ctx.add_id("NOPE");
        assert_eq!(ctx.enter_copy_member(&name),Err(Error::UnknownCopyMember("NOPE".to_string())));
    }
    #[test]
    fn first_registration_wins() {
        let mut ctx = super::test_helper();
        let name = ctx.add_id("REGS");
        let other = super::statement::parse_source("X        EQU   9\n");
        let member = ctx.add_copy_member(name.clone(),other,super::Location::new("file:///other.hlasm",super::lsp::Position::new(0,0)));
        assert_eq!(member.body.len(),3);
        assert_eq!(member.definition_location.file,super::COPYFILE);
        assert_eq!(ctx.copy_members().len(),1);
        assert!(ctx.get_copy_member(&name).is_some());
    }
    #[test]
    fn visited() {
        let ctx = super::test_helper();
        assert!(ctx.visited_files().contains(super::COPYFILE));
    }
    #[test]
    fn duplicate_registration_is_visited() {
        let mut ctx = super::test_helper();
        let name = ctx.add_id("REGS");
        let other = super::statement::parse_source("X        EQU   9\n");
        ctx.add_copy_member(name,other,super::Location::new("file:///other.hlasm",super::lsp::Position::new(0,0)));
        assert!(ctx.visited_files().contains("file:///other.hlasm"));
        assert_eq!(ctx.copy_members().len(),1);
    }
    #[test]
    fn nested_cursors_are_independent() {
        let mut ctx = super::test_helper();
        let name = ctx.add_id("REGS");
        ctx.enter_copy_member(&name).expect("enter failed");
        ctx.enter_copy_member(&name).expect("enter failed");
        assert_eq!(ctx.current_copy_stack().len(),2);
        ctx.current_copy_stack_mut()[1].current_statement = 2;
        assert_eq!(ctx.current_copy_stack()[0].current_statement,0);
        ctx.current_copy_stack_mut()[0].current_statement += 1;
        assert_eq!(ctx.current_copy_stack()[0].current_statement,1);
        assert_eq!(ctx.current_copy_stack()[1].current_statement,2);
        ctx.leave_copy_member().expect("leave failed");
        assert_eq!(ctx.current_copy_stack()[0].current_statement,1);
    }
    #[test]
    fn whole_stack_spans_sources() {
        let mut ctx = super::test_helper();
        let name = ctx.add_id("REGS");
        ctx.enter_copy_member(&name).expect("enter failed");
        ctx.push_statement_processing_with_source(super::super::super::processing::ProcessingKind::MacroDefinition,"file:///maclib/mac.hlasm");
        assert!(ctx.current_copy_stack().is_empty());
        assert_eq!(ctx.whole_copy_stack(),vec![name.clone()]);
        ctx.enter_copy_member(&name).expect("enter failed");
        assert_eq!(ctx.whole_copy_stack(),vec![name.clone(),name.clone()]);
        ctx.leave_copy_member().expect("leave failed");
        ctx.pop_statement_processing().expect("pop failed");
        assert_eq!(ctx.whole_copy_stack(),vec![name]);
    }
}

mod snapshots {
    use super::super::super::Error;
    use super::super::super::processing::ProcessingKind;
    #[test]
    fn round_trip() {
        let mut ctx = super::test_helper();
        let name = ctx.add_id("REGS");
        ctx.set_source_position(super::lsp::Position::new(5,9));
        ctx.set_source_indices(10,20,6);
        ctx.enter_copy_member(&name).expect("enter failed");
        ctx.current_copy_stack_mut()[0].current_statement = 1;
        let snap = ctx.capture_snapshot();
        assert_eq!(snap.copy_frames.len(),1);
        assert_eq!(snap.copy_frames[0].statement_offset,1);
        // move away, then restore
        ctx.leave_copy_member().expect("leave failed");
        ctx.set_source_position(super::lsp::Position::new(40,9));
        ctx.set_source_indices(0,0,0);
        ctx.apply_source_snapshot(snap.clone()).expect("apply failed");
        assert_eq!(ctx.capture_snapshot(),snap);
        assert_eq!(ctx.current_source().end_line,6);
        assert_eq!(ctx.current_copy_stack()[0].current_statement,1);
    }
    #[test]
    fn only_at_top_level() {
        let mut ctx = super::test_helper();
        let snap = ctx.capture_snapshot();
        ctx.push_statement_processing(ProcessingKind::Lookahead);
        assert_eq!(ctx.apply_source_snapshot(snap.clone()),Err(Error::SnapshotDepth));
        ctx.pop_statement_processing().expect("pop failed");
        assert!(ctx.apply_source_snapshot(snap).is_ok());
    }
    #[test]
    fn unknown_member_in_snapshot() {
        let mut ctx = super::test_helper();
        let name = ctx.add_id("REGS");
        ctx.enter_copy_member(&name).expect("enter failed");
        let mut snap = ctx.capture_snapshot();
        snap.copy_frames[0].copy_member = ctx.add_id("GONE");
        assert_eq!(ctx.apply_source_snapshot(snap),Err(Error::UnknownCopyMember("GONE".to_string())));
    }
}
