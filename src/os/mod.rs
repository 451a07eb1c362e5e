cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub(crate) mod linux;
        pub use linux::*;
    } else {
        compile_error!("image-inspect requires a Linux ELF host");
    }
}
