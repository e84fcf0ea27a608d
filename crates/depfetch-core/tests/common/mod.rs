#![allow(dead_code)]

pub mod drive_server;
