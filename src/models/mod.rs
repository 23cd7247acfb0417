pub mod mt1d;
