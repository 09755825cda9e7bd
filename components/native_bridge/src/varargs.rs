//! Native argument cursors.
//!
//! A cursor yields the arguments of one native call, one typed pop at a
//! time. Pops must follow the callee's declaration order; the cursor itself
//! has no idea what type sits at the current position.

use memory_manager::Handle;

use crate::sys::{jboolean, jbyte, jchar, jdouble, jfloat, jint, jlong, jshort, jvalue};

/// Typed, ordered access to native call arguments.
pub trait ArgCursor {
    /// Pops a `boolean`.
    fn pop_boolean(&mut self) -> jboolean;
    /// Pops a `byte`.
    fn pop_byte(&mut self) -> jbyte;
    /// Pops a `char`.
    fn pop_char(&mut self) -> jchar;
    /// Pops a `short`.
    fn pop_short(&mut self) -> jshort;
    /// Pops an `int`.
    fn pop_int(&mut self) -> jint;
    /// Pops a `float`.
    fn pop_float(&mut self) -> jfloat;
    /// Pops a `long`.
    fn pop_long(&mut self) -> jlong;
    /// Pops a `double`.
    fn pop_double(&mut self) -> jdouble;
    /// Pops a reference handle.
    fn pop_object(&mut self) -> Handle;
}

/// Cursor over a `jvalue` array, as passed to the `...A` entry points.
pub struct JValueCursor {
    next: *const jvalue,
}

impl JValueCursor {
    /// Creates a cursor at the first element of `args`.
    ///
    /// # Safety
    ///
    /// `args` must point to at least as many `jvalue`s as will be popped.
    pub unsafe fn new(args: *const jvalue) -> Self {
        Self { next: args }
    }

    fn pop(&mut self) -> jvalue {
        // SAFETY: guaranteed by the contract of `new`
        let value = unsafe { *self.next };
        self.next = self.next.wrapping_add(1);
        value
    }
}

macro_rules! jvalue_pops {
    ($($method:ident -> $ty:ty : $field:ident;)*) => {
        $(
            fn $method(&mut self) -> $ty {
                // SAFETY: every jvalue member is plain data of the union's size or smaller
                unsafe { self.pop().$field }
            }
        )*
    };
}

impl ArgCursor for JValueCursor {
    jvalue_pops! {
        pop_boolean -> jboolean: z;
        pop_byte -> jbyte: b;
        pop_char -> jchar: c;
        pop_short -> jshort: s;
        pop_int -> jint: i;
        pop_float -> jfloat: f;
        pop_long -> jlong: j;
        pop_double -> jdouble: d;
    }

    fn pop_object(&mut self) -> Handle {
        // SAFETY: as above
        Handle::from_raw(unsafe { self.pop().l } as usize)
    }
}
