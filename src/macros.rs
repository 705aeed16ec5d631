macro_rules! emit {
    ($context:expr, $opcode:expr) => {
        $context.line(format!("\t{}", $opcode))
    };

    ($context:expr, $opcode:expr, $($format:tt)*) => {
        $context.line(format!("\t{:8}{}", $opcode, format_args!($($format)*)))
    };
}
