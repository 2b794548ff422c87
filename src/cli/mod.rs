pub mod args;

use clap::Parser;

pub use args::{Arguments, Backend, StudyDataType};

pub fn parse() -> Arguments {
    Arguments::parse()
}
