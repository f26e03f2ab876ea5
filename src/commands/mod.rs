// commands/mod.rs - Command Module Registry
// Declares the bot's command modules for registration in main.rs

pub mod help;           // Usage help for the quote search
pub mod vvquote;        // 维维语录 image search (^vv语录 / ^维维语录)
