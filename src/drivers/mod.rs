pub mod joydev;
