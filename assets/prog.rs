mod __user_main_module__;

fn main() {
    std::env::set_var("RUST_BACKTRACE", "1");
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        // Marker line lets the client recognize where the panic report
        // starts in the stderr stream.
        eprintln!("#!my_code_panic_hook:");
        default_hook(info);
    }));

    __user_main_module__::main();
}
