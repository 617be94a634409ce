use chrono::Local;
use colored::Colorize;

fn get_timestamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

pub fn log_info(message: &str) {
    println!(
        "{} {} {}",
        format!("[{}]", get_timestamp()).dimmed(),
        "[INFO]".cyan().bold(),
        message
    );
}

pub fn log_success(message: &str) {
    println!(
        "{} {} {}",
        format!("[{}]", get_timestamp()).dimmed(),
        "[OK]".green().bold(),
        message
    );
}

pub fn log_warning(message: &str) {
    println!(
        "{} {} {}",
        format!("[{}]", get_timestamp()).dimmed(),
        "[WARN]".yellow().bold(),
        message
    );
}

pub fn log_error(message: &str) {
    eprintln!(
        "{} {} {}",
        format!("[{}]", get_timestamp()).dimmed(),
        "[ERROR]".red().bold(),
        message
    );
}
