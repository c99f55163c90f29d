//! Protocol helpers shared by all programmers

pub mod avr;
