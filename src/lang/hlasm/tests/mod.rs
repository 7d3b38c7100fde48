mod context_test;
mod copy_test;
mod outline_test;
