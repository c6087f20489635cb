// Join Operators Module
//
// Join inputs are gathered in full before joining. With concurrent gather
// enabled both inputs are drained on scoped worker threads that feed one
// bounded channel; the first failure from either side wins and stops the
// other side.

mod nested_loop;

pub use self::nested_loop::NestedLoopJoin;

use crossbeam::channel::{bounded, Receiver, Sender};
use log::{debug, trace};

use crate::query::executor::operators::{Operator, OperatorNode};
use crate::query::executor::result::{QueryError, QueryResult, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Message from a gathering worker
enum Gathered {
    Row(Side, Row),
    Finished(Side),
    Failed(Side, QueryError),
}

/// Drain both inputs, returning their rows in production order
pub(crate) fn gather(
    left: &mut OperatorNode,
    right: &mut OperatorNode,
    concurrent: bool,
    capacity: usize,
) -> QueryResult<(Vec<Row>, Vec<Row>)> {
    if !concurrent {
        return Ok((drain(left)?, drain(right)?));
    }

    let (sender, receiver) = bounded::<Gathered>(capacity.max(1));
    let outcome = crossbeam::scope(|scope| {
        for (side, input) in [(Side::Left, left), (Side::Right, right)] {
            let sender = sender.clone();
            scope.spawn(move |_| produce(side, input, sender));
        }
        drop(sender);
        collect(receiver)
    });
    match outcome {
        Ok(result) => result,
        Err(_) => Err(QueryError::Execution("join input worker panicked".to_string())),
    }
}

fn drain(input: &mut OperatorNode) -> QueryResult<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = input.next()? {
        rows.push(row);
    }
    Ok(rows)
}

fn produce(side: Side, input: &mut OperatorNode, sender: Sender<Gathered>) {
    loop {
        let message = match input.next() {
            Ok(Some(row)) => Gathered::Row(side, row),
            Ok(None) => Gathered::Finished(side),
            Err(e) => Gathered::Failed(side, e),
        };
        let last = !matches!(message, Gathered::Row(..));
        trace!("{:?} join input produced a message", side);
        // a closed channel means the consumer gave up
        if sender.send(message).is_err() || last {
            return;
        }
    }
}

fn collect(receiver: Receiver<Gathered>) -> QueryResult<(Vec<Row>, Vec<Row>)> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let (mut left_done, mut right_done) = (false, false);
    while !(left_done && right_done) {
        match receiver.recv() {
            Ok(Gathered::Row(Side::Left, row)) => left.push(row),
            Ok(Gathered::Row(Side::Right, row)) => right.push(row),
            Ok(Gathered::Finished(side)) => {
                let rows = match side {
                    Side::Left => {
                        left_done = true;
                        left.len()
                    }
                    Side::Right => {
                        right_done = true;
                        right.len()
                    }
                };
                debug!("{:?} join input finished after {} rows", side, rows);
            }
            Ok(Gathered::Failed(side, e)) => {
                debug!("{:?} join input failed: {}", side, e);
                return Err(e);
            }
            Err(_) => return Err(QueryError::Execution("join input worker stopped early".to_string())),
        }
    }
    Ok((left, right))
}
