mod declaration_tests;
mod end_of_pass_tests;
mod statement_tests;
