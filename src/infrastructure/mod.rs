pub mod imaging;
pub mod openai;
pub mod storage;
