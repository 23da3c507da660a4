//! Assembler pass tests.
