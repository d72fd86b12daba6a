pub mod mood_history;
