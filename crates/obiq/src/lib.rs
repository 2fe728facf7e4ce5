#![doc = include_str!("../../../README.md")]

mod builtins;
mod context;
mod eval;
mod exception;
mod expressions;
mod io;
mod lexer;
mod modules;
mod parse;
mod run;
mod types;
mod value;

pub use crate::{
    context::Context,
    exception::{ErrorKind, EvalResult, Exception, Flow, StackFrame},
    expressions::{Block, Loc, Param, Program, ProtocolSignature},
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    modules::ModuleLoader,
    run::{PROGRAM_ARGS_NAME, RunOptions, Runner, exit_status},
    types::{
        EnumInstance, ErrorInstance, ListInstance, MapInstance, MethodBody, MethodDef,
        MethodSignature, NativeFn, ObjectInstance, ProtocolInstance, RecordInstance, RecordType,
        ResultInstance, SetInstance,
    },
    value::Value,
};
