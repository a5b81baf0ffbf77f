mod commands;
mod matcher;
