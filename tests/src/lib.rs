#![cfg(test)]

mod scan;
