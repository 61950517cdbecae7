mod common;
mod notes;
mod sqlite;
mod transition;
