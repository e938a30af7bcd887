mod support;

mod board;
mod moves;
mod statuses;
mod workflow;
