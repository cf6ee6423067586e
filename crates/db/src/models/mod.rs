pub mod quotation_lock;
