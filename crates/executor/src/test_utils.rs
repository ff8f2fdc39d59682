//! A small evaluator for tests and demos
//!
//! Programs are lists headed by an operator atom:
//! - `[echo X]` returns `X`
//! - `[read K]` returns the stored value of `K`, or `[]` when absent
//! - `[copy FROM TO]` returns `[[TO value-of-FROM]]`, ready for the
//!   key-value backend
//! - `[fail MSG]` fails with `MSG`

use crate::evaluator::{Evaluator, Scry};
use async_trait::async_trait;
use ordo_common::Term;

#[derive(Debug, Default)]
pub struct ScriptEvaluator;

impl ScriptEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn echo(term: Term) -> Term {
        Term::pair(Term::from("echo"), term)
    }

    pub fn read(key: &str) -> Term {
        Term::pair(Term::from("read"), Term::from(key))
    }

    pub fn copy(from: &str, to: &str) -> Term {
        Term::List(vec![Term::from("copy"), Term::from(from), Term::from(to)])
    }

    pub fn fail(message: &str) -> Term {
        Term::pair(Term::from("fail"), Term::from(message))
    }
}

#[async_trait]
impl Evaluator for ScriptEvaluator {
    async fn evaluate(&self, program: Term, scry: &Scry) -> Result<Term, String> {
        let Some((op, args)) = program.as_list().and_then(|items| items.split_first()) else {
            return Err(format!("not a program: {}", program));
        };

        match (op.as_atom(), args) {
            (Some(b"echo"), [value]) => Ok(value.clone()),
            (Some(b"read"), [Term::Atom(key)]) => {
                let value = scry.read(key).await.map_err(|e| e.to_string())?;
                Ok(value.unwrap_or_else(Term::nil))
            }
            (Some(b"copy"), [Term::Atom(from), to @ Term::Atom(_)]) => {
                let value = scry.read(from).await.map_err(|e| e.to_string())?;
                Ok(Term::List(vec![Term::pair(
                    to.clone(),
                    value.unwrap_or_else(Term::nil),
                )]))
            }
            (Some(b"fail"), [message]) => Err(message.to_string()),
            _ => Err(format!("unknown program: {}", program)),
        }
    }
}
