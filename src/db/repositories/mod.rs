mod daily_records;
mod session_state;
