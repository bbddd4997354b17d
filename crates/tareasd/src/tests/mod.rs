//! Behavioural suites for the tareas daemon.

mod socket_behaviour;
mod support;
