//! Demo driver: interprets a pair of sample programs and prints what they
//! produce. The interpreter itself lives in the library modules.

use rasm::machine::interpret;

fn main() {
  let first_program = "
; My first program
mov  a, 5
inc  a
call function
msg  '(5+1)/2 = ', a    ; output message
end

function:
    div  a, 2
    ret
";

  let factorial = "
mov   a, 5
mov   b, a
mov   c, a
call  proc_fact
call  print
end

proc_fact:
    dec   b
    mul   c, b
    cmp   b, 1
    jne   proc_fact
    ret

print:
    msg   a, '! = ', c ; output text
    ret
";

  for program in &[first_program, factorial] {
    match interpret(program) {
      Ok(outcome) => println!("{}", outcome),
      Err(error)  => eprintln!("{}", error),
    }
  }
}
